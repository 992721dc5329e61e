//! Parses REPL input lines into [`Statement`]s or [`MetaCommand`]s.
use crate::errors::PrepareError;
use crate::storage::Row;

pub enum MetaCommand {
    Exit,
    Btree,
    Constants,
}

pub enum Statement {
    Insert(Row),
    Select,
    Update { id: u32, username: String, email: String },
    Delete { id: u32 },
}

/// Dispatches a leading-dot line to a [`MetaCommand`], or `None` if `line`
/// is not a meta command at all.
pub fn parse_meta(line: &str) -> Option<Result<MetaCommand, PrepareError>> {
    if !line.starts_with('.') {
        return None;
    }
    Some(match line {
        ".exit" => Ok(MetaCommand::Exit),
        ".btree" => Ok(MetaCommand::Btree),
        ".constants" => Ok(MetaCommand::Constants),
        other => Err(PrepareError::Unknown(other.to_string())),
    })
}

pub fn parse_statement(line: &str) -> Result<Statement, PrepareError> {
    let mut words = line.split_whitespace();
    let keyword = words.next().unwrap_or("");

    match keyword.to_lowercase().as_str() {
        "insert" => parse_insert(words),
        "select" => Ok(Statement::Select),
        "update" => parse_update(words),
        "delete" => parse_delete(words),
        _ => Err(PrepareError::Unknown(line.to_string())),
    }
}

fn parse_insert<'a>(mut words: impl Iterator<Item = &'a str>) -> Result<Statement, PrepareError> {
    let id = words.next().ok_or_else(|| PrepareError::Syntax("insert requires id username email".into()))?;
    let username = words.next().ok_or_else(|| PrepareError::Syntax("insert requires id username email".into()))?;
    let email = words.next().ok_or_else(|| PrepareError::Syntax("insert requires id username email".into()))?;
    if words.next().is_some() {
        return Err(PrepareError::Syntax("insert takes exactly 3 arguments".into()));
    }
    let id: i64 = id.parse().map_err(|_| PrepareError::Syntax(format!("'{}' is not an integer", id)))?;
    if id < 0 {
        return Err(PrepareError::NegativeId);
    }
    let row = Row::new(id as u32, username, email).map_err(|e| match e {
        crate::errors::Error::Prepare(p) => p,
        _ => PrepareError::Syntax("invalid row".into()),
    })?;
    Ok(Statement::Insert(row))
}

fn parse_update<'a>(mut words: impl Iterator<Item = &'a str>) -> Result<Statement, PrepareError> {
    let id = words.next().ok_or_else(|| PrepareError::Syntax("update requires id username email".into()))?;
    let username = words.next().ok_or_else(|| PrepareError::Syntax("update requires id username email".into()))?;
    let email = words.next().ok_or_else(|| PrepareError::Syntax("update requires id username email".into()))?;
    if words.next().is_some() {
        return Err(PrepareError::Syntax("update takes exactly 3 arguments".into()));
    }
    let id: i64 = id.parse().map_err(|_| PrepareError::Syntax(format!("'{}' is not an integer", id)))?;
    if id < 0 {
        return Err(PrepareError::NegativeId);
    }
    Ok(Statement::Update {
        id: id as u32,
        username: username.to_string(),
        email: email.to_string(),
    })
}

fn parse_delete<'a>(mut words: impl Iterator<Item = &'a str>) -> Result<Statement, PrepareError> {
    let id = words.next().ok_or_else(|| PrepareError::Syntax("delete requires id".into()))?;
    if words.next().is_some() {
        return Err(PrepareError::Syntax("delete takes exactly 1 argument".into()));
    }
    let id: i64 = id.parse().map_err(|_| PrepareError::Syntax(format!("'{}' is not an integer", id)))?;
    if id < 0 {
        return Err(PrepareError::NegativeId);
    }
    Ok(Statement::Delete { id: id as u32 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_insert() {
        let stmt = parse_statement("insert 1 alice alice@x.com").unwrap();
        assert!(matches!(stmt, Statement::Insert(row) if row.id == 1 && row.username == "alice"));
    }

    #[test]
    fn rejects_negative_id() {
        assert!(matches!(parse_statement("insert -1 a a@x"), Err(PrepareError::NegativeId)));
    }

    #[test]
    fn rejects_wrong_arg_count() {
        assert!(matches!(parse_statement("insert 1 a"), Err(PrepareError::Syntax(_))));
    }

    #[test]
    fn rejects_unrecognized_keyword() {
        assert!(matches!(parse_statement("frobnicate"), Err(PrepareError::Unknown(_))));
    }

    #[test]
    fn parses_meta_commands() {
        assert!(matches!(parse_meta(".exit"), Some(Ok(MetaCommand::Exit))));
        assert!(matches!(parse_meta("select"), None));
    }
}
