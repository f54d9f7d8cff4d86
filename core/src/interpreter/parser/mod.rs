//! Statement parser - PEST-based parser for the step notation
//!
//! Turns source lines into a [`Program`]: header metadata plus a flat list of
//! statements. Each `STEP` line is classified by its leading keyword and then
//! matched against that keyword's grammar rule.

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use super::errors::SyntaxError;
use super::types::{HeaderKind, Location, Program, Statement};

pub mod validator;


/* ===================== PEST Parser ===================== */

#[derive(Parser)]
#[grammar = "interpreter/parser/step.pest"]
struct StepParser;

pub type ParseResult<T> = Result<T, SyntaxError>;

/// Parser behaviour switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Reject malformed statements, stray lines and unbalanced blocks
    /// instead of dropping or tolerating them
    pub strict: bool,
}

impl ParseOptions {
    pub fn strict() -> Self {
        Self { strict: true }
    }
}

/// Content keywords in match order. First match wins.
const KEYWORDS: &[(&str, Rule)] = &[
    ("Set", Rule::assign),
    ("Import", Rule::import_stmt),
    ("KEY:", Rule::api_key),
    ("FOREACH", Rule::foreach_stmt),
    ("FOR", Rule::for_range),
    ("WHILE", Rule::while_stmt),
    ("IF", Rule::if_stmt),
    ("END IF", Rule::end_if),
    ("ELSE", Rule::else_stmt),
    ("END FOREACH", Rule::end_foreach),
    ("END FOR", Rule::end_for),
    ("END WHILE", Rule::end_while),
    ("RETURN", Rule::return_stmt),
    ("PRINT", Rule::print_stmt),
    ("BREAK", Rule::break_stmt),
    ("CONTINUE", Rule::continue_stmt),
    ("LIST", Rule::list_stmt),
    ("DICT", Rule::dict_stmt),
    ("APPEND", Rule::append_stmt),
    ("REMOVE", Rule::remove_stmt),
    ("GET", Rule::get_value),
    ("SORT", Rule::sort_stmt),
    ("FILTER", Rule::filter_stmt),
    ("MAP", Rule::map_stmt),
    ("REDUCE", Rule::reduce_stmt),
    ("TRY", Rule::try_stmt),
    ("CATCH", Rule::catch_stmt),
    ("END TRY", Rule::end_try),
    ("CALL", Rule::call_stmt),
    ("CREATE", Rule::create_stmt),
    ("LOAD_MODEL", Rule::load_model),
    ("PREDICT", Rule::predict_stmt),
    ("TRAIN", Rule::train_stmt),
];

/* ===================== Public API ===================== */

/// Parse program source with the default (permissive) options
pub fn parse_program(source: &str) -> ParseResult<Program> {
    parse_program_with(source, ParseOptions::default())
}

pub fn parse_program_with(source: &str, options: ParseOptions) -> ParseResult<Program> {
    let lines: Vec<&str> = source.lines().collect();
    parse_lines(&lines, options)
}

/// Parse a program given as raw lines
///
/// Blank lines and `#` comment lines are skipped. The first remaining line must
/// be an ALGORITHM, MODEL or API_CALL header. Body collection stops at the
/// first `END <header>` terminator.
pub fn parse_lines<S: AsRef<str>>(lines: &[S], options: ParseOptions) -> ParseResult<Program> {
    let mut cleaned = lines
        .iter()
        .enumerate()
        .map(|(i, line)| (i + 1, line.as_ref().trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));

    let (header_line, header) = cleaned.next().ok_or(SyntaxError::Empty)?;
    let kind = HeaderKind::from_line(header).ok_or_else(|| SyntaxError::MissingHeader {
        line: header_line,
        found: header.to_string(),
    })?;
    let name = header
        .split_whitespace()
        .nth(1)
        .ok_or(SyntaxError::MissingName { line: header_line })?;

    let mut program = Program {
        name: name.to_string(),
        kind,
        inputs: Vec::new(),
        output: None,
        body: Vec::new(),
        locations: Vec::new(),
    };

    for (line_no, line) in cleaned {
        if let Some(rest) = line.strip_prefix("INPUT:") {
            // A later INPUT line replaces the earlier one
            program.inputs = rest
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
        } else if let Some(rest) = line.strip_prefix("OUTPUT:") {
            program.output = Some(rest.trim().to_string());
        } else if is_terminator(line) {
            break;
        } else if line.starts_with("STEP") {
            if let Some((location, stmt)) = parse_step_line(line_no, line, options)? {
                program.locations.push(location);
                program.body.push(stmt);
            }
        } else if options.strict {
            return Err(SyntaxError::Unrecognized {
                line: line_no,
                content: line.to_string(),
            });
        } else {
            tracing::debug!(line = line_no, content = line, "ignoring line outside STEP");
        }
    }

    if options.strict {
        if let Some(err) = validator::validate_structure(&program).into_iter().next() {
            return Err(SyntaxError::Unbalanced {
                line: err.line,
                message: err.message,
            });
        }
    }

    tracing::debug!(
        name = %program.name,
        inputs = program.inputs.len(),
        statements = program.body.len(),
        "parsed program"
    );

    Ok(program)
}

/// Classify and parse the content of one STEP line
///
/// Content with no known keyword becomes [`Statement::Raw`]. A keyword whose
/// sub-pattern does not match is reported as [`SyntaxError::Malformed`].
pub fn parse_statement(content: &str, line: usize) -> ParseResult<Statement> {
    let Some((keyword, rule)) = classify(content) else {
        return Ok(Statement::Raw {
            text: content.to_string(),
        });
    };

    StepParser::parse(rule, content)
        .ok()
        .and_then(|mut pairs| pairs.next())
        .and_then(build_statement)
        .ok_or_else(|| SyntaxError::Malformed {
            line,
            keyword: keyword.to_string(),
            content: content.to_string(),
        })
}

fn is_terminator(line: &str) -> bool {
    HeaderKind::ALL
        .iter()
        .any(|kind| line.starts_with(&kind.terminator()))
}

/// Find the keyword a content string starts with
///
/// A keyword ending in an identifier character must not run into another one,
/// so `Settings = 1` is not a `Set` statement.
fn classify(content: &str) -> Option<(&'static str, Rule)> {
    KEYWORDS.iter().copied().find(|(keyword, _)| {
        content.strip_prefix(keyword).is_some_and(|rest| {
            let ends_in_word = keyword.ends_with(|c: char| c.is_ascii_alphanumeric() || c == '_');
            !ends_in_word || !rest.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_')
        })
    })
}

fn parse_step_line(
    line_no: usize,
    line: &str,
    options: ParseOptions,
) -> ParseResult<Option<(Location, Statement)>> {
    let parsed = StepParser::parse(Rule::step_line, line)
        .ok()
        .and_then(|mut pairs| pairs.next());

    let Some(step_line) = parsed else {
        if options.strict {
            return Err(SyntaxError::Malformed {
                line: line_no,
                keyword: "STEP".to_string(),
                content: line.to_string(),
            });
        }
        tracing::warn!(line = line_no, content = line, "dropping malformed STEP line");
        return Ok(None);
    };

    let mut ops = Operands::new(step_line);
    let step = ops.text().and_then(|n| n.parse().ok()).unwrap_or_default();
    let content = ops.text().unwrap_or_default();
    let location = Location {
        line: line_no,
        step,
    };

    match parse_statement(&content, line_no) {
        Ok(stmt) => Ok(Some((location, stmt))),
        Err(err) if options.strict => Err(err),
        Err(err) => {
            tracing::warn!(line = line_no, step, "dropping statement: {}", err);
            Ok(None)
        }
    }
}

/* ===================== AST Builder ===================== */

/// Cursor over the operand pairs of a matched rule
struct Operands<'i> {
    pairs: Vec<Pair<'i, Rule>>,
    at: usize,
}

impl<'i> Operands<'i> {
    fn new(pair: Pair<'i, Rule>) -> Self {
        Self {
            pairs: pair.into_inner().filter(|p| p.as_rule() != Rule::EOI).collect(),
            at: 0,
        }
    }

    fn peek(&self) -> Option<Rule> {
        self.pairs.get(self.at).map(|p| p.as_rule())
    }

    fn next(&mut self) -> Option<Pair<'i, Rule>> {
        let pair = self.pairs.get(self.at).cloned();
        self.at += 1;
        pair
    }

    /// Trimmed text of the next operand
    fn text(&mut self) -> Option<String> {
        self.next().map(|p| p.as_str().trim().to_string())
    }

    /// Text inside the quotes of a `model_name` operand
    fn unquoted(&mut self) -> Option<String> {
        let pair = self.next()?;
        pair.into_inner().next().map(|p| p.as_str().to_string())
    }

    /// Call arguments, empty when the argument list is absent
    fn args(&mut self) -> Vec<String> {
        if self.peek() != Some(Rule::arg_list) {
            return Vec::new();
        }
        self.next()
            .map(|list| {
                list.into_inner()
                    .map(|arg| arg.as_str().trim().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn build_statement(pair: Pair<Rule>) -> Option<Statement> {
    let rule = pair.as_rule();
    let mut ops = Operands::new(pair);

    let stmt = match rule {
        Rule::assign => Statement::Assign {
            target: ops.text()?,
            expr: ops.text()?,
        },
        Rule::import_stmt => Statement::Import { module: ops.text()? },
        Rule::api_key => Statement::ApiKey { value: ops.text()? },

        Rule::foreach_stmt => Statement::ForEach {
            var: ops.text()?,
            iterable: ops.text()?,
        },
        Rule::for_range => Statement::ForRange {
            var: ops.text()?,
            start: ops.text()?,
            end: ops.text()?,
        },
        Rule::while_stmt => Statement::While { cond: ops.text()? },
        Rule::if_stmt => Statement::If { cond: ops.text()? },
        Rule::end_if => Statement::EndIf,
        Rule::else_stmt => Statement::Else,
        Rule::end_foreach => Statement::EndForEach,
        Rule::end_for => Statement::EndFor,
        Rule::end_while => Statement::EndWhile,

        Rule::return_stmt => Statement::Return {
            expr: ops.text().unwrap_or_default(),
        },
        Rule::print_stmt => Statement::Print {
            expr: ops.text().unwrap_or_default(),
        },
        Rule::break_stmt => Statement::Break,
        Rule::continue_stmt => Statement::Continue,

        Rule::list_stmt => Statement::ListCreate {
            name: ops.text()?,
            expr: ops.text()?,
        },
        Rule::dict_stmt => Statement::DictCreate {
            name: ops.text()?,
            expr: ops.text()?,
        },
        Rule::append_stmt => Statement::ListAppend {
            list: ops.text()?,
            expr: ops.text()?,
        },
        Rule::remove_stmt => Statement::ListRemove {
            list: ops.text()?,
            expr: ops.text()?,
        },
        Rule::get_value => Statement::GetValue {
            source: ops.text()?,
            target: ops.text()?,
        },

        Rule::sort_stmt => {
            let source = ops.text()?;
            let target = ops.text().unwrap_or_else(|| source.clone());
            Statement::Sort { source, target }
        }
        Rule::filter_stmt => Statement::Filter {
            source: ops.text()?,
            predicate: ops.text()?,
            target: ops.text()?,
        },
        Rule::map_stmt => Statement::Map {
            source: ops.text()?,
            transform: ops.text()?,
            target: ops.text()?,
        },
        Rule::reduce_stmt => Statement::Reduce {
            source: ops.text()?,
            combine: ops.text()?,
            target: ops.text()?,
        },

        Rule::try_stmt => Statement::Try,
        Rule::catch_stmt => Statement::Catch {
            error_var: ops.text().unwrap_or_else(|| "error".to_string()),
        },
        Rule::end_try => Statement::EndTry,

        Rule::call_stmt => Statement::Call {
            func: ops.text()?,
            args: ops.args(),
            result: ops.text(),
        },
        Rule::create_stmt => Statement::CreateInstance {
            var: ops.text()?,
            class: ops.text()?,
            args: ops.args(),
        },

        Rule::load_model => Statement::LoadModel {
            model: ops.unquoted()?,
            var: ops.text().unwrap_or_else(|| "model".to_string()),
        },
        Rule::predict_stmt => Statement::Predict {
            input: ops.text()?,
            output: ops.text()?,
        },
        Rule::train_stmt => Statement::Train {
            model: ops.text()?,
            data: ops.text()?,
        },

        _ => return None,
    };

    Some(stmt)
}
