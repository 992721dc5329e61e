//! The REPL (Read-Eval-Print-Loop) module.
use crate::command::{self, MetaCommand, Statement};
use crate::console::print_prompt;
use crate::errors::Error;
use crate::storage::Table;
use crate::{echo, echo_error, echo_lines};
use crossterm::{
    cursor,
    event::{self, KeyCode, KeyEvent, KeyModifiers},
    execute, terminal, ExecutableCommand,
};
use std::io::{self, Write};

const VERSION: &str = env!("CARGO_PKG_VERSION");

const BANNER: &str = r#"
Enter ".exit" to quit, ".btree" to dump the tree, ".constants" to dump layout.
Statements: insert <id> <username> <email> | select | update <id> <username> <email> | delete <id>
"#;

pub fn main(table: &mut Table) -> Result<(), Error> {
    terminal::enable_raw_mode()?;
    execute!(std::io::stdout(), cursor::EnableBlinking)?;
    io::stdout().execute(terminal::Clear(terminal::ClearType::FromCursorDown))?;
    let result = repl_loop(table);
    terminal::disable_raw_mode()?;
    result
}

fn repl_loop(table: &mut Table) -> Result<(), Error> {
    echo!("mysqlite {} REPL.\n", VERSION);
    echo_lines!("{}", BANNER);

    let mut input = String::new();
    let mut history: Vec<String> = Vec::new();
    let mut history_index = 0;

    loop {
        input.clear();
        print_prompt()?;
        match read_input(&mut input, &mut history, &mut history_index) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                echo!("\nBye\n");
                return Ok(());
            }
            Err(e) => return Err(Error::from(e)),
        }
        execute!(std::io::stdout(), cursor::MoveToNextLine(0))?;

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(meta) = command::parse_meta(line) {
            match meta {
                Ok(MetaCommand::Exit) => {
                    echo!("Bye\n");
                    return Ok(());
                }
                Ok(MetaCommand::Btree) => match table.debug_btree() {
                    Ok(tree) => echo_lines!("{}", tree),
                    Err(e) => echo_error!("{}\n", crate::err!(e)),
                },
                Ok(MetaCommand::Constants) => echo_lines!("{}\n", Table::debug_constants()),
                Err(e) => echo_error!("{}\n", e),
            }
            continue;
        }

        match command::parse_statement(line) {
            Ok(stmt) => execute_statement(table, stmt),
            Err(e) => echo_error!("{}\n", e),
        }
    }
}

fn execute_statement(table: &mut Table, stmt: Statement) {
    match stmt {
        Statement::Insert(row) => match table.insert(&row) {
            Ok(()) => echo!("Executed.\n"),
            Err(e) => echo_error!("{}\n", crate::err!(e)),
        },
        Statement::Select => match table.select() {
            Ok(rows) => {
                for row in rows {
                    echo!("({}, {}, {})\n", row.id, row.username, row.email);
                }
                echo!("Executed.\n");
            }
            Err(e) => echo_error!("{}\n", crate::err!(e)),
        },
        Statement::Update { id, username, email } => match table.update(id, &username, &email) {
            Ok(()) => echo!("Executed.\n"),
            Err(e) => echo_error!("{}\n", crate::err!(e)),
        },
        Statement::Delete { id } => match table.delete(id) {
            Ok(()) => echo!("Executed.\n"),
            Err(e) => echo_error!("{}\n", crate::err!(e)),
        },
    }
}

fn read_input(input: &mut String, history: &mut Vec<String>, history_index: &mut usize) -> io::Result<()> {
    loop {
        if let event::Event::Key(KeyEvent { code, modifiers, .. }) = event::read()? {
            match code {
                KeyCode::Enter => {
                    if !input.trim().is_empty() {
                        history.push(input.clone());
                        *history_index = history.len();
                    }
                    break;
                }
                KeyCode::Up => {
                    if *history_index > 0 {
                        *history_index -= 1;
                        input.clear();
                        input.push_str(&history[*history_index]);
                        redraw_line(input)?;
                    }
                }
                KeyCode::Down => {
                    if *history_index < history.len().saturating_sub(1) {
                        *history_index += 1;
                        input.clear();
                        input.push_str(&history[*history_index]);
                    } else {
                        *history_index = history.len();
                        input.clear();
                    }
                    redraw_line(input)?;
                }
                KeyCode::Backspace => {
                    if !input.is_empty() {
                        input.pop();
                        execute!(std::io::stdout(), cursor::MoveLeft(1))?;
                        execute!(std::io::stdout(), terminal::Clear(terminal::ClearType::UntilNewLine))?;
                        io::stdout().flush()?;
                    }
                }
                KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                    return Err(io::Error::new(io::ErrorKind::Interrupted, "Ctrl-C"));
                }
                KeyCode::Char('d') if modifiers.contains(KeyModifiers::CONTROL) => {
                    return Err(io::Error::new(io::ErrorKind::Interrupted, "Ctrl-D"));
                }
                KeyCode::Char(c) => {
                    input.push(c);
                    write!(io::stdout(), "{}", c)?;
                    io::stdout().flush()?;
                }
                _ => {}
            }
        }
    }
    Ok(())
}

fn redraw_line(input: &str) -> io::Result<()> {
    execute!(std::io::stdout(), terminal::Clear(terminal::ClearType::CurrentLine))?;
    execute!(std::io::stdout(), cursor::MoveToColumn(0))?;
    print_prompt()?;
    write!(io::stdout(), "{}", input)?;
    io::stdout().flush()
}
