//! Compute device selection shared by the Candle models.

use candle_core::Device;
use tracing::{debug, info};

use crate::config::DevicePreference;
use crate::error::{ModelError, ModelResult};

/// Resolve a device preference. `Auto` prefers a GPU when one was compiled in.
pub(crate) fn select_device(pref: DevicePreference) -> ModelResult<Device> {
    match pref {
        DevicePreference::Auto => Ok(try_gpu().unwrap_or_else(|| {
            info!("Using CPU");
            Device::Cpu
        })),
        DevicePreference::Gpu => try_gpu().ok_or_else(|| ModelError::DeviceNotAvailable {
            reason: gpu_not_available_reason(),
        }),
        DevicePreference::Cpu => Ok(Device::Cpu),
    }
}

/// Try to create a GPU device based on enabled features.
pub(crate) fn try_gpu() -> Option<Device> {
    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(device) => {
                info!("Using Metal GPU");
                return Some(device);
            }
            Err(e) => debug!("Metal not available: {}", e),
        }
    }

    #[cfg(feature = "cuda")]
    {
        match Device::new_cuda(0) {
            Ok(device) => {
                info!("Using CUDA GPU");
                return Some(device);
            }
            Err(e) => debug!("CUDA not available: {}", e),
        }
    }

    debug!("No GPU backend compiled in");
    None
}

pub(crate) fn gpu_not_available_reason() -> String {
    if cfg!(feature = "metal") {
        "Metal GPU not available on this system".to_string()
    } else if cfg!(feature = "cuda") {
        "CUDA GPU not available. Ensure NVIDIA drivers and CUDA toolkit are installed".to_string()
    } else {
        "the candle crate has not been built with GPU support. \
         Rebuild with --features metal (macOS) or --features cuda (NVIDIA GPU)"
            .to_string()
    }
}
