//! `CREATE TABLE` parser.
//!
//! Recovers a [`TableModel`] from `SHOW CREATE TABLE` output. The parser is
//! deliberately forgiving: a missing table name or missing parenthesized body
//! is a hard [`EngineError::Parse`], but any sub-clause that cannot be
//! understood is skipped and recorded as a warning so comparison of the rest
//! of the table continues.
//!
//! The single load-bearing primitive is [`split_top_level`], which splits the
//! table body on commas at parenthesis depth zero with an explicit depth
//! counter, so `decimal(10,2)` and `KEY (a, b)` stay atomic.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::model::{Column, ForeignKey, Index, TableModel, TableOptions};

/// Result of parsing one `CREATE TABLE` statement.
#[derive(Debug, Clone)]
pub struct ParsedTable {
    /// The recovered structural model.
    pub table: TableModel,
    /// Recoverable issues hit while parsing (skipped clauses etc.).
    pub warnings: Vec<String>,
}

static TABLE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?(?:`(?P<qdb>[^`]+)`|(?P<bdb>[A-Za-z0-9_$]+))(?:\s*\.\s*(?:`(?P<qname>[^`]+)`|(?P<bname>[A-Za-z0-9_$]+)))?",
    )
    .expect("table name regex")
});

static CHARACTER_SET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)CHARACTER\s+SET\s+(\w+)").expect("charset regex"));

static COLLATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)COLLATE\s+(\w+)").expect("collate regex"));

static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)COMMENT\s+'((?:[^']|'')*)'").expect("comment regex"));

static USING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)USING\s+(\w+)").expect("using regex"));

static ON_DELETE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)ON\s+DELETE\s+(RESTRICT|CASCADE|SET\s+NULL|SET\s+DEFAULT|NO\s+ACTION)")
        .expect("on delete regex")
});

static ON_UPDATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)ON\s+UPDATE\s+(RESTRICT|CASCADE|SET\s+NULL|SET\s+DEFAULT|NO\s+ACTION)")
        .expect("on update regex")
});

static ENGINE_OPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)ENGINE\s*=\s*(\w+)").expect("engine regex"));

static CHARSET_OPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)DEFAULT\s+(?:CHARSET|CHARACTER\s+SET)\s*=\s*(\w+)").expect("charset opt regex")
});

static COLLATE_OPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)COLLATE\s*=\s*(\w+)").expect("collate opt regex"));

static COMMENT_OPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)COMMENT\s*=\s*'((?:[^']|'')*)'").expect("comment opt regex"));

/// Parses one `CREATE TABLE` statement into a [`ParsedTable`].
pub fn parse_create_table(ddl: &str) -> Result<ParsedTable> {
    if ddl.trim().is_empty() {
        return Err(EngineError::parse("<unnamed>", "empty DDL statement"));
    }

    let clean = strip_comments(ddl);

    let name = match extract_table_name(&clean) {
        Some(name) => name,
        None => {
            return Err(EngineError::parse(
                "<unnamed>",
                "could not extract table name",
            ));
        }
    };

    let (body, tail) = extract_body(&clean)
        .ok_or_else(|| EngineError::parse(&name, "missing parenthesized table body"))?;

    let mut warnings = Vec::new();
    let mut columns = Vec::new();
    let mut indexes = std::collections::BTreeMap::new();
    let mut foreign_keys = std::collections::BTreeMap::new();

    for part in split_top_level(&body) {
        let part = collapse_ws(part.trim());
        if part.is_empty() {
            continue;
        }
        match classify_part(&part) {
            PartKind::PrimaryKey => match parse_primary_key(&part) {
                Some(index) => {
                    indexes.insert(index.name.clone(), index);
                }
                None => warnings.push(format!("skipped unparseable primary key: {part}")),
            },
            PartKind::Index {
                unique,
                fulltext,
                spatial,
            } => match parse_index(&part, unique, fulltext, spatial) {
                Some(index) => {
                    indexes.insert(index.name.clone(), index);
                }
                None => warnings.push(format!("skipped unparseable index: {part}")),
            },
            PartKind::ForeignKey => match parse_foreign_key_definition(&part) {
                Some(fk) => {
                    foreign_keys.insert(fk.name.clone(), fk);
                }
                None => warnings.push(format!("skipped unparseable foreign key: {part}")),
            },
            PartKind::Check => {
                warnings.push(format!("check constraint not modeled, skipped: {part}"));
            }
            PartKind::OtherConstraint => {
                warnings.push(format!("skipped unsupported constraint: {part}"));
            }
            PartKind::Column => match parse_column(&part, columns.len()) {
                Some(column) => columns.push(column),
                None => warnings.push(format!("skipped unparseable column: {part}")),
            },
        }
    }

    let options = parse_table_options(&tail);

    debug!(
        table = %name,
        columns = columns.len(),
        indexes = indexes.len(),
        foreign_keys = foreign_keys.len(),
        "parsed CREATE TABLE"
    );

    Ok(ParsedTable {
        table: TableModel {
            name,
            columns,
            indexes,
            foreign_keys,
            options,
        },
        warnings,
    })
}

/// Parses a standalone foreign-key clause, with or without the leading
/// `CONSTRAINT name`. Returns `None` when the clause has no usable name or
/// shape.
pub fn parse_foreign_key_definition(clause: &str) -> Option<ForeignKey> {
    let clause = collapse_ws(clause.trim());
    let mut rest = clause.as_str();

    let name = if let Some(after) = strip_keyword(rest, "CONSTRAINT") {
        let (name, after) = take_identifier(after)?;
        rest = after;
        Some(name)
    } else {
        None
    };

    rest = strip_keyword(rest, "FOREIGN")?;
    rest = strip_keyword(rest, "KEY")?;

    // Inline form may carry the index name between KEY and the column list.
    let name = match name {
        Some(name) => name,
        None => {
            let (name, after) = take_identifier(rest)?;
            rest = after;
            name
        }
    };

    let (cols, rest) = take_paren_group(rest)?;
    let rest = strip_keyword(rest, "REFERENCES")?;
    let (referenced_table, rest) = take_qualified_identifier(rest)?;
    let (ref_cols, rest) = take_paren_group(rest)?;

    let on_delete = ON_DELETE_RE
        .captures(rest)
        .map(|c| collapse_ws(&c[1]).to_uppercase());
    let on_update = ON_UPDATE_RE
        .captures(rest)
        .map(|c| collapse_ws(&c[1]).to_uppercase());

    Some(ForeignKey {
        name,
        columns: split_column_list(&cols),
        referenced_table,
        referenced_columns: split_column_list(&ref_cols),
        on_delete,
        on_update,
    })
}

// ===========================================================================
// Comment stripping and whitespace
// ===========================================================================

/// Removes SQL comments while respecting quoted strings.
///
/// `-- ` and `#` line comments are dropped; `/* ... */` blocks are dropped,
/// except MySQL version hints (`/*!40100 ... */`) whose payload is kept.
pub(crate) fn strip_comments(sql: &str) -> String {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut i = 0;
    let mut quote: Option<char> = None;

    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' && i + 1 < chars.len() {
                out.push(chars[i + 1]);
                i += 2;
                continue;
            }
            if c == q {
                // Doubled quote stays inside the literal.
                if i + 1 < chars.len() && chars[i + 1] == q {
                    out.push(chars[i + 1]);
                    i += 2;
                    continue;
                }
                quote = None;
            }
            i += 1;
            continue;
        }

        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                out.push(c);
                i += 1;
            }
            '-' if chars.get(i + 1) == Some(&'-')
                && matches!(chars.get(i + 2), None | Some(&' ') | Some(&'\t') | Some(&'\n')) =>
            {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                let version_hint = chars.get(i + 2) == Some(&'!');
                let mut j = i + 2;
                if version_hint {
                    j += 1;
                    // Skip the version number after `!`.
                    while j < chars.len() && chars[j].is_ascii_digit() {
                        j += 1;
                    }
                }
                let start = j;
                while j + 1 < chars.len() && !(chars[j] == '*' && chars[j + 1] == '/') {
                    j += 1;
                }
                if version_hint {
                    out.extend(&chars[start..j.min(chars.len())]);
                }
                i = (j + 2).min(chars.len());
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

/// Collapses runs of whitespace into single spaces.
pub(crate) fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ===========================================================================
// Structural scanning
// ===========================================================================

/// Splits `s` on commas at parenthesis depth zero, respecting quotes.
pub(crate) fn split_top_level(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;
    let chars: Vec<char> = s.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = quote {
            current.push(c);
            if c == '\\' && i + 1 < chars.len() {
                current.push(chars[i + 1]);
                i += 2;
                continue;
            }
            if c == q {
                if i + 1 < chars.len() && chars[i + 1] == q {
                    current.push(chars[i + 1]);
                    i += 2;
                    continue;
                }
                quote = None;
            }
            i += 1;
            continue;
        }
        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                current.push(c);
            }
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => {
                parts.push(std::mem::take(&mut current));
                i += 1;
                continue;
            }
            _ => current.push(c),
        }
        i += 1;
    }
    if !current.trim().is_empty() {
        parts.push(current);
    }
    parts
}

/// Finds the top-level parenthesized table body. Returns `(body, tail)`.
fn extract_body(sql: &str) -> Option<(String, String)> {
    let chars: Vec<char> = sql.chars().collect();
    let mut quote: Option<char> = None;
    let mut open = None;

    for (i, &c) in chars.iter().enumerate() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '(' => {
                open = Some(i);
                break;
            }
            _ => {}
        }
    }
    let open = open?;

    let mut depth = 0;
    let mut quote: Option<char> = None;
    for (i, &c) in chars.iter().enumerate().skip(open) {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    let body: String = chars[open + 1..i].iter().collect();
                    let tail: String = chars[i + 1..].iter().collect();
                    return Some((body, tail));
                }
            }
            _ => {}
        }
    }
    None
}

fn extract_table_name(sql: &str) -> Option<String> {
    let caps = TABLE_NAME_RE.captures(sql)?;
    // When a schema qualifier is present the second component is the name.
    let second = caps
        .name("qname")
        .or_else(|| caps.name("bname"))
        .map(|m| m.as_str().to_string());
    match second {
        Some(name) => Some(name),
        None => caps
            .name("qdb")
            .or_else(|| caps.name("bdb"))
            .map(|m| m.as_str().to_string()),
    }
}

// ===========================================================================
// Clause classification
// ===========================================================================

enum PartKind {
    PrimaryKey,
    Index {
        unique: bool,
        fulltext: bool,
        spatial: bool,
    },
    ForeignKey,
    Check,
    OtherConstraint,
    Column,
}

fn classify_part(part: &str) -> PartKind {
    let upper = part.to_uppercase();
    if upper.starts_with("PRIMARY KEY") {
        PartKind::PrimaryKey
    } else if upper.starts_with("UNIQUE KEY")
        || upper.starts_with("UNIQUE INDEX")
        || upper.starts_with("UNIQUE ")
        || upper.starts_with("UNIQUE(")
    {
        PartKind::Index {
            unique: true,
            fulltext: false,
            spatial: false,
        }
    } else if upper.starts_with("FULLTEXT") {
        PartKind::Index {
            unique: false,
            fulltext: true,
            spatial: false,
        }
    } else if upper.starts_with("SPATIAL") {
        PartKind::Index {
            unique: false,
            fulltext: false,
            spatial: true,
        }
    } else if upper.starts_with("KEY ") || upper.starts_with("KEY`") || upper.starts_with("INDEX ")
    {
        PartKind::Index {
            unique: false,
            fulltext: false,
            spatial: false,
        }
    } else if upper.starts_with("CONSTRAINT") {
        if upper.contains("FOREIGN KEY") {
            PartKind::ForeignKey
        } else if upper.contains("CHECK") {
            PartKind::Check
        } else {
            PartKind::OtherConstraint
        }
    } else if upper.starts_with("FOREIGN KEY") {
        PartKind::ForeignKey
    } else if upper.starts_with("CHECK ") || upper.starts_with("CHECK(") {
        PartKind::Check
    } else {
        PartKind::Column
    }
}

// ===========================================================================
// Clause parsers
// ===========================================================================

fn parse_primary_key(part: &str) -> Option<Index> {
    let rest = strip_keyword(part, "PRIMARY")?;
    let rest = strip_keyword(rest, "KEY")?;
    let (cols, rest) = take_paren_group(rest)?;
    let index_type = USING_RE
        .captures(rest)
        .map(|c| c[1].to_uppercase())
        .unwrap_or_else(|| "BTREE".to_string());
    Some(Index {
        name: Index::PRIMARY_NAME.to_string(),
        columns: split_column_list(&cols),
        index_type,
        unique: true,
        primary: true,
        fulltext: false,
    })
}

fn parse_index(part: &str, unique: bool, fulltext: bool, spatial: bool) -> Option<Index> {
    let mut rest = part;
    if unique {
        rest = strip_keyword(rest, "UNIQUE")?;
    } else if fulltext {
        rest = strip_keyword(rest, "FULLTEXT")?;
    } else if spatial {
        rest = strip_keyword(rest, "SPATIAL")?;
    }
    if let Some(after) = strip_keyword(rest, "KEY") {
        rest = after;
    } else if let Some(after) = strip_keyword(rest, "INDEX") {
        rest = after;
    } else if !unique && !fulltext && !spatial {
        return None;
    }

    // Unnamed indexes get a server-generated name we cannot know; skip them.
    let (name, rest) = take_identifier(rest)?;
    let (cols, rest) = take_paren_group(rest)?;

    let index_type = if spatial {
        "SPATIAL".to_string()
    } else {
        USING_RE
            .captures(rest)
            .map(|c| c[1].to_uppercase())
            .unwrap_or_else(|| "BTREE".to_string())
    };

    Some(Index {
        name,
        columns: split_column_list(&cols),
        index_type,
        unique,
        primary: false,
        fulltext,
    })
}

fn parse_column(part: &str, position: usize) -> Option<Column> {
    let (name, rest) = take_identifier(part)?;
    let definition = rest.trim().to_string();
    if definition.is_empty() {
        return None;
    }

    let upper = definition.to_uppercase();
    let data_type = take_data_type(&definition)?;

    let nullable = !upper.contains("NOT NULL");
    let auto_increment = upper.contains("AUTO_INCREMENT");
    let default = parse_default_clause(&definition);
    let charset = CHARACTER_SET_RE
        .captures(&definition)
        .map(|c| c[1].to_string());
    let collation = COLLATE_RE.captures(&definition).map(|c| c[1].to_string());
    let comment = COMMENT_RE
        .captures(&definition)
        .map(|c| c[1].replace("''", "'"));

    Some(Column {
        name,
        data_type,
        nullable,
        default,
        auto_increment,
        charset,
        collation,
        comment,
        position,
        definition,
    })
}

/// Extracts the leading type spec, keeping an attached parenthesized
/// argument list (`decimal(10,2)`, `enum('a','b')`).
fn take_data_type(definition: &str) -> Option<String> {
    let definition = definition.trim_start();
    let base_end = definition
        .find(|c: char| c.is_whitespace() || c == '(')
        .unwrap_or(definition.len());
    if base_end == 0 {
        return None;
    }
    let base = &definition[..base_end];
    let rest = &definition[base_end..];
    if rest.starts_with('(') {
        if let Some((inner, _)) = take_paren_group(rest) {
            return Some(format!("{base}({inner})"));
        }
    }
    Some(base.to_string())
}

/// Parses the value of a `DEFAULT` clause. Quoted literals come back
/// unquoted; parenthesized expressions keep their parentheses.
fn parse_default_clause(definition: &str) -> Option<String> {
    let upper = definition.to_uppercase();
    let mut search_from = 0;
    let pos = loop {
        let found = upper[search_from..].find("DEFAULT")?;
        let abs = search_from + found;
        let before_ok = abs == 0
            || upper[..abs]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_whitespace());
        let after = abs + "DEFAULT".len();
        let after_ok = upper[after..].chars().next().is_some_and(|c| c.is_whitespace());
        if before_ok && after_ok {
            break abs;
        }
        search_from = after;
    };

    let rest = definition[pos + "DEFAULT".len()..].trim_start();
    if rest.starts_with('\'') {
        let chars: Vec<char> = rest.chars().collect();
        let mut value = String::new();
        let mut i = 1;
        while i < chars.len() {
            if chars[i] == '\'' {
                if chars.get(i + 1) == Some(&'\'') {
                    value.push('\'');
                    i += 2;
                    continue;
                }
                break;
            }
            value.push(chars[i]);
            i += 1;
        }
        Some(value)
    } else if rest.starts_with('(') {
        take_paren_group(rest).map(|(inner, _)| format!("({inner})"))
    } else {
        let word_end = rest
            .find(|c: char| c.is_whitespace() || c == ',')
            .unwrap_or(rest.len());
        let word = &rest[..word_end];
        let tail = &rest[word_end..];
        // Functions like current_timestamp(6) keep their argument list.
        if tail.starts_with('(') {
            if let Some((inner, _)) = take_paren_group(tail) {
                return Some(format!("{word}({inner})"));
            }
        }
        if word.is_empty() {
            None
        } else {
            Some(word.to_string())
        }
    }
}

fn parse_table_options(tail: &str) -> TableOptions {
    TableOptions {
        engine: ENGINE_OPT_RE.captures(tail).map(|c| c[1].to_string()),
        charset: CHARSET_OPT_RE.captures(tail).map(|c| c[1].to_string()),
        collation: COLLATE_OPT_RE.captures(tail).map(|c| c[1].to_string()),
        comment: COMMENT_OPT_RE
            .captures(tail)
            .map(|c| c[1].replace("''", "'")),
    }
}

// ===========================================================================
// Token helpers
// ===========================================================================

/// Case-insensitively strips a leading keyword plus trailing whitespace.
fn strip_keyword<'a>(s: &'a str, keyword: &str) -> Option<&'a str> {
    let s = s.trim_start();
    if s.len() >= keyword.len() && s[..keyword.len()].eq_ignore_ascii_case(keyword) {
        let rest = &s[keyword.len()..];
        if rest.is_empty() || rest.starts_with(|c: char| !c.is_alphanumeric() && c != '_') {
            return Some(rest.trim_start());
        }
    }
    None
}

/// Takes a backtick-quoted or bare identifier from the front of `s`.
fn take_identifier(s: &str) -> Option<(String, &str)> {
    let s = s.trim_start();
    if let Some(rest) = s.strip_prefix('`') {
        let end = rest.find('`')?;
        return Some((rest[..end].to_string(), &rest[end + 1..]));
    }
    let end = s
        .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
        .unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    Some((s[..end].to_string(), &s[end..]))
}

/// Takes an identifier that may be schema-qualified (`db`.`name`); returns
/// the final component.
fn take_qualified_identifier(s: &str) -> Option<(String, &str)> {
    let (first, rest) = take_identifier(s)?;
    let trimmed = rest.trim_start();
    if let Some(after_dot) = trimmed.strip_prefix('.') {
        let (second, rest) = take_identifier(after_dot)?;
        return Some((second, rest));
    }
    Some((first, rest))
}

/// Takes a balanced parenthesized group from the front of `s`. Returns the
/// inner text and the remainder after the closing parenthesis.
fn take_paren_group(s: &str) -> Option<(String, &str)> {
    let s = s.trim_start();
    if !s.starts_with('(') {
        return None;
    }
    let mut depth = 0;
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some((s[1..i].to_string(), &s[i + 1..]));
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits an index/constraint column list, stripping backticks but keeping
/// prefix lengths (`` `name`(10) `` becomes `name(10)`).
fn split_column_list(list: &str) -> Vec<String> {
    split_top_level(list)
        .iter()
        .map(|col| {
            let col = col.trim();
            match col.strip_prefix('`') {
                Some(rest) => match rest.find('`') {
                    Some(end) => {
                        // Keep a `(len)` prefix suffix, drop ASC/DESC.
                        let suffix = rest[end + 1..].trim();
                        if suffix.starts_with('(') {
                            format!("{}{suffix}", &rest[..end])
                        } else {
                            rest[..end].to_string()
                        }
                    }
                    None => col.to_string(),
                },
                None => col.to_string(),
            }
        })
        .filter(|c| !c.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const USERS_DDL: &str = r#"CREATE TABLE `users` (
  `id` int(11) NOT NULL AUTO_INCREMENT,
  `email` varchar(255) NOT NULL,
  `display_name` varchar(100) DEFAULT NULL COMMENT 'shown in the UI',
  `balance` decimal(10,2) NOT NULL DEFAULT 0.00,
  `created_at` timestamp NOT NULL DEFAULT current_timestamp(),
  `tenant_id` int(11) DEFAULT NULL,
  PRIMARY KEY (`id`),
  UNIQUE KEY `email_idx` (`email`),
  KEY `tenant_idx` (`tenant_id`),
  FULLTEXT KEY `name_search` (`display_name`),
  CONSTRAINT `fk_users_tenant` FOREIGN KEY (`tenant_id`) REFERENCES `tenants` (`id`) ON DELETE SET NULL ON UPDATE CASCADE
) ENGINE=InnoDB AUTO_INCREMENT=42 DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci COMMENT='user accounts'"#;

    #[test]
    fn parses_table_name_and_options() {
        let parsed = parse_create_table(USERS_DDL).unwrap();
        assert_eq!(parsed.table.name, "users");
        assert_eq!(parsed.table.options.engine.as_deref(), Some("InnoDB"));
        assert_eq!(parsed.table.options.charset.as_deref(), Some("utf8mb4"));
        assert_eq!(
            parsed.table.options.collation.as_deref(),
            Some("utf8mb4_unicode_ci")
        );
        assert_eq!(
            parsed.table.options.comment.as_deref(),
            Some("user accounts")
        );
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn parses_columns_in_order_with_flags() {
        let parsed = parse_create_table(USERS_DDL).unwrap();
        let table = &parsed.table;
        assert_eq!(
            table.column_names(),
            vec![
                "id",
                "email",
                "display_name",
                "balance",
                "created_at",
                "tenant_id"
            ]
        );

        let id = table.column("id").unwrap();
        assert_eq!(id.data_type, "int(11)");
        assert!(!id.nullable);
        assert!(id.auto_increment);
        assert_eq!(id.position, 0);

        let name = table.column("display_name").unwrap();
        assert!(name.nullable);
        assert_eq!(name.default.as_deref(), Some("NULL"));
        assert_eq!(name.comment.as_deref(), Some("shown in the UI"));

        let balance = table.column("balance").unwrap();
        assert_eq!(balance.data_type, "decimal(10,2)");
        assert_eq!(balance.default.as_deref(), Some("0.00"));

        let created = table.column("created_at").unwrap();
        assert_eq!(created.default.as_deref(), Some("current_timestamp()"));
    }

    #[test]
    fn parses_indexes_with_flags() {
        let parsed = parse_create_table(USERS_DDL).unwrap();
        let table = &parsed.table;

        let pk = table.primary_key().unwrap();
        assert!(pk.primary);
        assert!(pk.unique);
        assert_eq!(pk.columns, vec!["id"]);

        let email = &table.indexes["email_idx"];
        assert!(email.unique);
        assert!(!email.primary);

        let tenant = &table.indexes["tenant_idx"];
        assert!(!tenant.unique);
        assert_eq!(tenant.index_type, "BTREE");

        let ft = &table.indexes["name_search"];
        assert!(ft.fulltext);
    }

    #[test]
    fn parses_foreign_key_with_actions() {
        let parsed = parse_create_table(USERS_DDL).unwrap();
        let fk = &parsed.table.foreign_keys["fk_users_tenant"];
        assert_eq!(fk.columns, vec!["tenant_id"]);
        assert_eq!(fk.referenced_table, "tenants");
        assert_eq!(fk.referenced_columns, vec!["id"]);
        assert_eq!(fk.on_delete.as_deref(), Some("SET NULL"));
        assert_eq!(fk.on_update.as_deref(), Some("CASCADE"));
    }

    #[test]
    fn splitter_keeps_parenthesized_groups_atomic() {
        let parts = split_top_level("`a` decimal(10,2) NOT NULL, KEY `k` (`a`,`b`), `c` int");
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].trim(), "`a` decimal(10,2) NOT NULL");
        assert_eq!(parts[1].trim(), "KEY `k` (`a`,`b`)");
    }

    #[test]
    fn splitter_ignores_commas_inside_strings() {
        let parts = split_top_level("`s` enum('a,b','c') DEFAULT 'a,b', `t` int");
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn missing_table_name_is_a_parse_error() {
        let err = parse_create_table("CREATE TABLE (id int)").unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn missing_body_is_a_parse_error() {
        let err = parse_create_table("CREATE TABLE `t`").unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn check_constraint_is_skipped_with_warning() {
        let ddl = "CREATE TABLE `t` (`a` int, CONSTRAINT `positive` CHECK (`a` > 0)) ENGINE=InnoDB";
        let parsed = parse_create_table(ddl).unwrap();
        assert_eq!(parsed.table.columns.len(), 1);
        assert_eq!(parsed.warnings.len(), 1);
        assert!(parsed.warnings[0].contains("check constraint"));
    }

    #[test]
    fn version_comment_payload_is_kept() {
        let ddl = "CREATE TABLE `t` (`a` int) /*!40100 DEFAULT CHARSET=latin1 */";
        let parsed = parse_create_table(ddl).unwrap();
        assert_eq!(parsed.table.options.charset.as_deref(), Some("latin1"));
    }

    #[test]
    fn line_comments_are_stripped() {
        let ddl = "CREATE TABLE `t` (\n  `a` int, -- trailing note\n  `b` int\n)";
        let parsed = parse_create_table(ddl).unwrap();
        assert_eq!(parsed.table.column_names(), vec!["a", "b"]);
    }

    #[test]
    fn schema_qualified_name_uses_final_component() {
        let ddl = "CREATE TABLE `app`.`orders` (`id` int)";
        let parsed = parse_create_table(ddl).unwrap();
        assert_eq!(parsed.table.name, "orders");
    }

    #[test]
    fn generated_column_definition_is_retained_verbatim() {
        let ddl = "CREATE TABLE `t` (\
            `price` decimal(10,2) NOT NULL, \
            `discount` decimal(10,2) NOT NULL DEFAULT 0.00, \
            `net` decimal(10,2) GENERATED ALWAYS AS (`price` - `discount`) STORED)";
        let parsed = parse_create_table(ddl).unwrap();
        let net = parsed.table.column("net").unwrap();
        assert!(net.definition.contains("GENERATED ALWAYS AS"));
        assert!(net.definition.contains("`price` - `discount`"));
    }

    #[test]
    fn standalone_foreign_key_definition() {
        let fk = parse_foreign_key_definition(
            "CONSTRAINT `fk_o_u` FOREIGN KEY (`user_id`) REFERENCES `users` (`id`) ON DELETE CASCADE",
        )
        .unwrap();
        assert_eq!(fk.name, "fk_o_u");
        assert_eq!(fk.columns, vec!["user_id"]);
        assert_eq!(fk.on_delete.as_deref(), Some("CASCADE"));
        assert_eq!(fk.on_update, None);
    }

    #[test]
    fn composite_foreign_key_columns() {
        let fk = parse_foreign_key_definition(
            "CONSTRAINT `fk_c` FOREIGN KEY (`a`, `b`) REFERENCES `parent` (`x`, `y`)",
        )
        .unwrap();
        assert_eq!(fk.columns, vec!["a", "b"]);
        assert_eq!(fk.referenced_columns, vec!["x", "y"]);
    }

    #[test]
    fn unnamed_unique_index_is_skipped_with_warning() {
        let ddl = "CREATE TABLE `t` (`a` int, UNIQUE (`a`))";
        let parsed = parse_create_table(ddl).unwrap();
        assert!(parsed.table.indexes.is_empty());
        assert_eq!(parsed.warnings.len(), 1);
    }
}
