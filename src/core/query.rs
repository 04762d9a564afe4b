//! 上游查詢文件（XML）的組裝。
//!
//! 認證金鑰以 `<LOGIN authenticationkey="..."/>` 內嵌在文件中，不走 HTTP header。

use chrono::{Days, NaiveDate};
use std::borrow::Cow;
use std::fmt;

pub const ROUTE_OBJECT_TYPE: &str = "FerryRoute";
pub const ANNOUNCEMENT_OBJECT_TYPE: &str = "FerryAnnouncement";
pub const DEFAULT_SCHEMA_VERSION: &str = "1.2";

const ROUTE_FIELDS: [&str; 5] = ["Id", "Name", "FromHarbour", "ToHarbour", "TimeTable"];
const ANNOUNCEMENT_FIELDS: [&str; 5] = ["RouteName", "StartTime", "EndTime", "Message", "Priority"];

/// 過濾條件樹
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpr {
    Eq { name: String, value: String },
    Lt { name: String, value: String },
    Gt { name: String, value: String },
    Like { name: String, value: String },
    And(Vec<FilterExpr>),
}

impl FilterExpr {
    pub fn eq(name: impl Into<String>, value: impl Into<String>) -> Self {
        FilterExpr::Eq {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn lt(name: impl Into<String>, value: impl Into<String>) -> Self {
        FilterExpr::Lt {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn gt(name: impl Into<String>, value: impl Into<String>) -> Self {
        FilterExpr::Gt {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn like(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        FilterExpr::Like {
            name: name.into(),
            value: pattern.into(),
        }
    }

    /// 子字串比對：`%needle%`
    pub fn contains(name: impl Into<String>, needle: &str) -> Self {
        Self::like(name, format!("%{}%", needle))
    }

    pub fn and(exprs: impl IntoIterator<Item = FilterExpr>) -> Self {
        FilterExpr::And(exprs.into_iter().collect())
    }

    fn render_into(&self, lines: &mut Vec<String>, depth: usize) {
        let indent = "  ".repeat(depth);
        let (tag, name, value) = match self {
            FilterExpr::Eq { name, value } => ("EQ", name, value),
            FilterExpr::Lt { name, value } => ("LT", name, value),
            FilterExpr::Gt { name, value } => ("GT", name, value),
            FilterExpr::Like { name, value } => ("LIKE", name, value),
            FilterExpr::And(children) => {
                lines.push(format!("{}<AND>", indent));
                for child in children {
                    child.render_into(lines, depth + 1);
                }
                lines.push(format!("{}</AND>", indent));
                return;
            }
        };

        lines.push(format!(
            r#"{}<{} name="{}" value="{}" />"#,
            indent,
            tag,
            escape_xml(name),
            escape_xml(value)
        ));
    }
}

/// 一個物件類型的查詢：過濾條件 + 要取回的欄位
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    object_type: String,
    schema_version: String,
    filter: Option<FilterExpr>,
    include_fields: Vec<String>,
}

impl Query {
    pub fn new(object_type: impl Into<String>) -> Self {
        let object_type = object_type.into();
        debug_assert!(!object_type.is_empty(), "object type must not be empty");
        Self {
            object_type,
            schema_version: DEFAULT_SCHEMA_VERSION.to_string(),
            filter: None,
            include_fields: Vec::new(),
        }
    }

    pub fn with_schema_version(mut self, version: impl Into<String>) -> Self {
        self.schema_version = version.into();
        self
    }

    pub fn with_filter(mut self, filter: FilterExpr) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn include<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    pub fn include_fields(&self) -> &[String] {
        &self.include_fields
    }

    /// 轉成上游的查詢文件，空白壓縮為單一空格
    pub fn render(&self, credential: &str) -> QueryDocument {
        let mut lines = vec![
            "<REQUEST>".to_string(),
            format!(r#"  <LOGIN authenticationkey="{}" />"#, escape_xml(credential)),
            format!(
                r#"  <QUERY objecttype="{}" schemaversion="{}">"#,
                escape_xml(&self.object_type),
                escape_xml(&self.schema_version)
            ),
        ];

        if let Some(filter) = &self.filter {
            lines.push("    <FILTER>".to_string());
            filter.render_into(&mut lines, 3);
            lines.push("    </FILTER>".to_string());
        }

        for field in &self.include_fields {
            lines.push(format!("    <INCLUDE>{}</INCLUDE>", escape_xml(field)));
        }

        lines.push("  </QUERY>".to_string());
        lines.push("</REQUEST>".to_string());

        QueryDocument(collapse_whitespace(&lines.join("\n")))
    }
}

/// 已渲染的查詢文件。內含認證金鑰，所以 `Debug` 不輸出內容。
#[derive(Clone, PartialEq, Eq)]
pub struct QueryDocument(String);

impl QueryDocument {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn byte_len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Debug for QueryDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QueryDocument(<{} bytes, redacted>)", self.0.len())
    }
}

/// 每一行去掉前後空白後以單一空格連接。
/// 屬性值中的換行已在 `escape_xml` 轉成字元參照，所以只有結構上的換行會被壓縮。
pub fn collapse_whitespace(document: &str) -> String {
    document
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn escape_xml(value: &str) -> Cow<'_, str> {
    if !value
        .chars()
        .any(|c| matches!(c, '&' | '<' | '>' | '"' | '\'' | '\n' | '\r' | '\t'))
    {
        return Cow::Borrowed(value);
    }

    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '\n' => escaped.push_str("&#10;"),
            '\r' => escaped.push_str("&#13;"),
            '\t' => escaped.push_str("&#9;"),
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

/// 指定航線的時刻表查詢
pub fn route_query(route_name: &str) -> Query {
    Query::new(ROUTE_OBJECT_TYPE)
        .with_filter(FilterExpr::eq("Name", route_name))
        .include(ROUTE_FIELDS)
}

/// 航線公告查詢；給定日期時只取當天有效的公告
pub fn announcement_query(route_name: &str, active_on: Option<NaiveDate>) -> Query {
    let by_route = FilterExpr::contains("RouteName", route_name);
    let filter = match active_on {
        Some(date) => {
            let next_day = date.checked_add_days(Days::new(1)).unwrap_or(date);
            FilterExpr::and([
                by_route,
                FilterExpr::lt("StartTime", format!("{}T00:00:00", next_day.format("%Y-%m-%d"))),
                FilterExpr::gt("EndTime", format!("{}T00:00:00", date.format("%Y-%m-%d"))),
            ])
        }
        None => by_route,
    };

    Query::new(ANNOUNCEMENT_OBJECT_TYPE)
        .with_filter(filter)
        .include(ANNOUNCEMENT_FIELDS)
}

/// 最小查詢，只用來確認金鑰是否有效
pub fn key_check_query(route_name: &str) -> Query {
    Query::new(ROUTE_OBJECT_TYPE)
        .with_filter(FilterExpr::eq("Name", route_name))
        .include(["Name"])
}

/// 不指定 INCLUDE，上游會回傳完整物件
pub fn route_explore_query(route_name: &str) -> Query {
    Query::new(ROUTE_OBJECT_TYPE).with_filter(FilterExpr::eq("Name", route_name))
}
