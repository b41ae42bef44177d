//! Curated match tables.
//!
//! [`MatchDictionary`] is the one authoritative source for every hand-tuned
//! keyword table the pipeline consults: greeting tokens, per-product keyword
//! lists, keyword→category rules, query expansion rules, the category filter's
//! intents, the fusion reranker's category keywords and the relevance-gate
//! intents.
//!
//! Table order is significant wherever "first match wins" applies, so every
//! table is a `Vec`, never a map.
//!
//! The shipped tables come from [`MatchDictionary::builtin`]; a YAML file with
//! the same shape (camelCase keys) can replace them via
//! [`MatchDictionary::from_path`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::Category;
use crate::errors::{ShopError, ShopResult};

// ============================================================================
// Table rows
// ============================================================================

/// Near-synonym phrases pointing at one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductKeywords {
    pub product_id: String,
    pub keywords: Vec<String>,
}

/// A named group of keywords pointing at a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRule {
    pub name: String,
    pub category: Category,
    pub keywords: Vec<String>,
}

impl CategoryRule {
    /// Whether any keyword occurs in `text`.
    pub fn matches(&self, text: &str) -> bool {
        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }
}

/// Synonyms appended to the query when `keyword` occurs in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpansionRule {
    pub keyword: String,
    pub expansions: Vec<String>,
}

/// A segmented token that implies a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryKeyword {
    pub keyword: String,
    pub category: Category,
}

// ============================================================================
// MatchDictionary
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDictionary {
    /// Substrings marking a greeting.
    pub greetings: Vec<String>,

    /// Keyword matcher pass 1.
    pub product_keywords: Vec<ProductKeywords>,

    /// Keyword matcher pass 3.
    pub category_rules: Vec<CategoryRule>,

    /// Query expansion, first match wins.
    pub expansion_rules: Vec<ExpansionRule>,

    /// Category filter intents, first match wins.
    pub filter_intents: Vec<CategoryRule>,

    /// Fusion reranker: exact token → category.
    pub fusion_category_keywords: Vec<CategoryKeyword>,

    /// Fusion relevance gate intents, first match wins.
    pub relevance_intents: Vec<CategoryRule>,
}

impl Default for MatchDictionary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl MatchDictionary {
    /// Load a replacement dictionary from YAML and validate it.
    pub fn from_path(path: &Path) -> ShopResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ShopError::dictionary_invalid(path, e.to_string()))?;
        let dictionary: Self = serde_yaml::from_str(&content)
            .map_err(|e| ShopError::dictionary_invalid(path, e.to_string()))?;
        dictionary
            .validate()
            .map_err(|msg| ShopError::dictionary_invalid(path, msg))?;

        tracing::debug!(
            "Loaded match dictionary from {} ({} product entries)",
            path.display(),
            dictionary.product_keywords.len()
        );
        Ok(dictionary)
    }

    /// Check structural sanity: no empty names, ids, keywords or lists.
    pub fn validate(&self) -> Result<(), String> {
        fn check_list(what: &str, owner: &str, list: &[String]) -> Result<(), String> {
            if list.is_empty() {
                return Err(format!("{} '{}' has no entries", what, owner));
            }
            if list.iter().any(|k| k.trim().is_empty()) {
                return Err(format!("{} '{}' contains an empty entry", what, owner));
            }
            Ok(())
        }

        check_list("greetings", "greetings", &self.greetings)?;

        for entry in &self.product_keywords {
            if entry.product_id.trim().is_empty() {
                return Err("product keyword entry with empty productId".to_string());
            }
            check_list("product keywords", &entry.product_id, &entry.keywords)?;
        }

        for (table, rules) in [
            ("categoryRules", &self.category_rules),
            ("filterIntents", &self.filter_intents),
            ("relevanceIntents", &self.relevance_intents),
        ] {
            for rule in rules {
                if rule.name.trim().is_empty() {
                    return Err(format!("{} has a rule with an empty name", table));
                }
                check_list(table, &rule.name, &rule.keywords)?;
            }
        }

        for rule in &self.expansion_rules {
            if rule.keyword.trim().is_empty() {
                return Err("expansion rule with empty keyword".to_string());
            }
            check_list("expansion rule", &rule.keyword, &rule.expansions)?;
        }

        if self
            .fusion_category_keywords
            .iter()
            .any(|k| k.keyword.trim().is_empty())
        {
            return Err("fusionCategoryKeywords contains an empty keyword".to_string());
        }

        Ok(())
    }

    /// Category implied by an exact segmented token, for fusion weighting.
    pub fn fusion_category(&self, token: &str) -> Option<Category> {
        self.fusion_category_keywords
            .iter()
            .find(|k| k.keyword == token)
            .map(|k| k.category)
    }

    /// The shipped tables.
    pub fn builtin() -> Self {
        use Category::*;

        Self {
            greetings: strings(&["你好", "您好", "hello", "hi"]),
            product_keywords: vec![
                product("SPORTS003", &["帐篷", "登山帐篷", "户外帐篷", "露营帐篷", "野营帐篷"]),
                product("SPORTS004", &["保温瓶", "水壶", "保温杯", "户外水壶", "露营水壶"]),
                product("BOOK006", &["步道", "登山", "户外指南", "徒步指南"]),
                product("SPORTS006", &["泳镜", "游泳镜", "游泳用品", "游泳装备", "专业泳镜"]),
                product("SPORTS001", &["鞋子", "鞋", "跑鞋", "越野鞋", "运动鞋"]),
                product("SPORTS002", &["头盔", "自行车头盔", "骑行头盔"]),
                product("SPORTS005", &["羽毛球拍", "球拍"]),
                product("SPORTS007", &["篮球"]),
                product("SPORTS008", &["哑铃", "健身器材"]),
                product("ELEC001", &["耳机", "蓝牙耳机", "运动耳机"]),
                product("ELEC002", &["充电宝", "移动电源"]),
                product("ELEC003", &["键盘", "机械键盘"]),
                product("ELEC004", &["显示器", "屏幕"]),
                product("ELEC005", &["平板", "儿童平板"]),
                product("ELEC006", &["手环", "智能手环"]),
                product("ELEC007", &["路由器", "wifi"]),
                product("ELEC008", &["车载支架", "手机支架"]),
                product("BOOK001", &["历史书", "罗马", "历史"]),
                product("BOOK002", &["食谱", "菜谱", "日本菜", "料理"]),
                product("BOOK003", &["小说", "村上春树", "挪威的森林"]),
                product("BOOK004", &["投资", "股票", "理财"]),
                product("BOOK005", &["科幻", "沙丘"]),
                product("BOOK007", &["文学", "卡夫卡", "变形记"]),
                product("OFFICE001", &["摄像头", "会议摄像头"]),
                product("OFFICE002", &["钢笔", "笔"]),
                product("OFFICE003", &["碎纸机"]),
                product("OFFICE004", &["椅子", "办公椅"]),
                product("OFFICE005", &["标签机"]),
                product("OFFICE006", &["笔记本支架", "电脑支架"]),
                product("OFFICE007", &["台灯", "护眼灯"]),
            ],
            category_rules: vec![
                rule("sports", SportsOutdoor, &["运动", "户外", "体育", "健身", "锻炼"]),
                rule("camping", SportsOutdoor, &["露营", "野营", "户外装备", "帐篷", "登山", "徒步"]),
                rule("shoes", SportsOutdoor, &["鞋子", "鞋", "跑鞋", "越野鞋", "运动鞋"]),
                rule(
                    "sports_equipment",
                    SportsOutdoor,
                    &["球拍", "羽毛球拍", "篮球", "哑铃", "泳镜", "头盔", "游泳", "游泳用品"],
                ),
                rule("outdoor_gear", SportsOutdoor, &["保温瓶", "水壶", "户外"]),
                rule("electronics", Electronics, &["电子", "数码", "科技"]),
                rule("audio", Electronics, &["耳机", "耳麦", "蓝牙", "音响"]),
                rule("computer", Electronics, &["电脑", "键盘", "显示器", "路由器", "平板", "支架"]),
                rule("mobile", Electronics, &["手机", "充电宝", "移动电源", "手环", "车载"]),
                rule("books", Books, &["书", "书籍", "小说", "历史", "投资", "科幻", "旅游"]),
                rule("outdoor_books", Books, &["步道", "登山指南", "户外指南"]),
                rule("novels", Books, &["小说", "文学", "村上春树", "卡夫卡", "科幻"]),
                rule("guides", Books, &["指南", "攻略", "食谱", "菜谱"]),
                rule("office", Office, &["办公", "工作", "文具"]),
                rule(
                    "office_equipment",
                    Office,
                    &["摄像头", "钢笔", "碎纸机", "椅子", "台灯", "标签机"],
                ),
            ],
            expansion_rules: vec![
                expansion("手环", &["智能手环", "运动手环", "健康手环", "小米手环"]),
                expansion("耳机", &["蓝牙耳机", "运动耳机", "无线耳机"]),
                expansion("充电宝", &["移动电源", "充电器", "电源银行"]),
                expansion("键盘", &["机械键盘", "电脑键盘", "办公键盘"]),
                expansion("显示器", &["电脑显示器", "液晶显示器", "屏幕"]),
                expansion("平板", &["平板电脑", "儿童平板", "iPad"]),
                expansion("路由器", &["无线路由器", "WiFi路由器", "网络设备"]),
                // stands and mounts are desk accessories, so 支架 expands to
                // office synonyms while keeping its place among electronics
                expansion("支架", &["笔记本支架", "电脑支架", "桌面支架"]),
                expansion("鞋", &["运动鞋", "跑步鞋", "越野鞋", "户外鞋"]),
                expansion("帐篷", &["户外帐篷", "登山帐篷", "露营帐篷"]),
                expansion("保温瓶", &["保温杯", "户外水壶", "保温水壶"]),
                expansion("球拍", &["羽毛球拍", "网球拍", "运动器材"]),
                expansion("篮球", &["运动球", "体育用品"]),
                expansion("哑铃", &["健身器材", "力量训练", "运动器械"]),
                expansion("头盔", &["骑行头盔", "自行车头盔", "安全头盔"]),
                expansion("泳镜", &["游泳镜", "游泳用品", "水上运动"]),
                expansion("书", &["书籍", "图书", "读物"]),
                expansion("小说", &["文学作品", "小说书籍"]),
                expansion("历史", &["历史书籍", "史学著作"]),
                expansion("投资", &["投资理财", "金融书籍"]),
                expansion("科幻", &["科幻小说", "科幻书籍"]),
                expansion("食谱", &["烹饪书籍", "菜谱", "料理指南"]),
                expansion("指南", &["指导书籍", "参考书"]),
                expansion("椅子", &["办公椅", "工作椅", "座椅"]),
                expansion("台灯", &["办公台灯", "护眼灯", "桌面灯"]),
                expansion("摄像头", &["网络摄像头", "会议摄像头"]),
                expansion("钢笔", &["办公笔", "书写用品"]),
                expansion("碎纸机", &["办公设备", "文件处理"]),
                expansion("标签机", &["标签打印机", "办公设备"]),
            ],
            filter_intents: vec![
                rule(
                    "electronics",
                    Electronics,
                    &["手环", "耳机", "充电宝", "键盘", "显示器", "平板", "路由器", "支架", "电子", "数码"],
                ),
                rule(
                    "sports",
                    SportsOutdoor,
                    &["鞋", "帐篷", "保温瓶", "球拍", "篮球", "哑铃", "头盔", "泳镜", "运动", "健身", "户外"],
                ),
                rule(
                    "books",
                    Books,
                    &["书", "小说", "历史", "投资", "科幻", "食谱", "指南", "书籍"],
                ),
                rule(
                    "office",
                    Office,
                    &["椅子", "台灯", "摄像头", "钢笔", "碎纸机", "标签机", "办公"],
                ),
            ],
            fusion_category_keywords: vec![
                category_keyword("运动", SportsOutdoor),
                category_keyword("健身", SportsOutdoor),
                category_keyword("体育", SportsOutdoor),
                category_keyword("器材", SportsOutdoor),
                category_keyword("电子", Electronics),
                category_keyword("数码", Electronics),
                category_keyword("书", Books),
                category_keyword("小说", Books),
                category_keyword("办公", Office),
            ],
            relevance_intents: vec![
                rule(
                    "sports",
                    SportsOutdoor,
                    &["运动", "体育", "健身", "锻炼", "球拍", "篮球", "哑铃", "器材", "户外"],
                ),
                rule(
                    "electronics",
                    Electronics,
                    &["电子", "数码", "电脑", "手机", "平板", "耳机", "键盘"],
                ),
                rule("books", Books, &["书", "小说", "文学", "历史", "投资", "科幻"]),
                rule("office", Office, &["办公", "工作", "椅子", "台灯", "笔"]),
            ],
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn product(id: &str, keywords: &[&str]) -> ProductKeywords {
    ProductKeywords {
        product_id: id.to_string(),
        keywords: strings(keywords),
    }
}

fn rule(name: &str, category: Category, keywords: &[&str]) -> CategoryRule {
    CategoryRule {
        name: name.to_string(),
        category,
        keywords: strings(keywords),
    }
}

fn expansion(keyword: &str, expansions: &[&str]) -> ExpansionRule {
    ExpansionRule {
        keyword: keyword.to_string(),
        expansions: strings(expansions),
    }
}

fn category_keyword(keyword: &str, category: Category) -> CategoryKeyword {
    CategoryKeyword {
        keyword: keyword.to_string(),
        category,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_is_valid() {
        let dict = MatchDictionary::builtin();
        assert!(dict.validate().is_ok());
        assert_eq!(dict.product_keywords.len(), 30);
        assert_eq!(dict.category_rules.len(), 15);
        assert_eq!(dict.filter_intents.len(), 4);
    }

    #[test]
    fn test_builtin_order_is_preserved() {
        let dict = MatchDictionary::builtin();
        assert_eq!(dict.product_keywords[0].product_id, "SPORTS003");
        assert_eq!(dict.expansion_rules[0].keyword, "手环");
        let names: Vec<_> = dict.filter_intents.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["electronics", "sports", "books", "office"]);
    }

    #[test]
    fn test_bracket_rule_keeps_position_with_office_synonyms() {
        let dict = MatchDictionary::builtin();
        let pos = dict
            .expansion_rules
            .iter()
            .position(|r| r.keyword == "支架")
            .unwrap();
        assert_eq!(pos, 7);
        assert_eq!(dict.expansion_rules[pos].expansions[0], "笔记本支架");
        assert_eq!(
            dict.expansion_rules.iter().filter(|r| r.keyword == "支架").count(),
            1
        );
    }

    #[test]
    fn test_fusion_category_is_exact_token() {
        let dict = MatchDictionary::builtin();
        assert_eq!(dict.fusion_category("运动"), Some(Category::SportsOutdoor));
        assert_eq!(dict.fusion_category("运动鞋"), None);
    }

    #[test]
    fn test_yaml_roundtrip_through_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("dictionary.yaml");
        let yaml = serde_yaml::to_string(&MatchDictionary::builtin()).unwrap();
        assert!(yaml.contains("productKeywords"));
        std::fs::write(&path, yaml).unwrap();

        let loaded = MatchDictionary::from_path(&path).unwrap();
        assert_eq!(loaded, MatchDictionary::builtin());
    }

    #[test]
    fn test_from_path_rejects_empty_keyword_list() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("dictionary.yaml");
        let mut dict = MatchDictionary::builtin();
        dict.product_keywords[0].keywords.clear();
        std::fs::write(&path, serde_yaml::to_string(&dict).unwrap()).unwrap();

        let err = MatchDictionary::from_path(&path).unwrap_err();
        assert!(matches!(err, ShopError::DictionaryInvalid { .. }));
        assert!(err.to_string().contains("SPORTS003"));
    }
}
