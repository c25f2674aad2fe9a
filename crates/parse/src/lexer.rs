//! The one-pass lexer for qualified names: `ident`, `name.field`,
//! `name.3` (a bit selector), `name[4]` (an array index), in any
//! combination.

use smv_ast::{Ast, Node};

pub(crate) struct NameError {
    pub msg: String,
}

/// Lexes one whitespace-delimited token into a qualified-name node.
pub(crate) fn lex_name<'a>(ast: &Ast<'a>, token: &str) -> Result<Node<'a>, NameError> {
    let mut chars = token.char_indices().peekable();

    let head = lex_ident(token, &mut chars)
        .ok_or_else(|| NameError { msg: format!("expected an identifier, found `{token}`") })?;
    let mut name = ast.atom(head);

    while let Some(&(pos, c)) = chars.peek() {
        match c {
            '.' => {
                chars.next();
                match chars.peek() {
                    Some(&(_, d)) if d.is_ascii_digit() => {
                        let number = lex_number(&mut chars);
                        name = ast.bit(name, number);
                    }
                    _ => {
                        let field = lex_ident(token, &mut chars).ok_or_else(|| NameError {
                            msg: format!("expected a field after `.` in `{token}`"),
                        })?;
                        name = ast.dot(name, ast.atom(field));
                    }
                }
            }
            '[' => {
                chars.next();
                let index = match chars.peek() {
                    Some(&(_, d)) if d.is_ascii_digit() => lex_number(&mut chars),
                    _ => {
                        return Err(NameError {
                            msg: format!("expected an index after `[` in `{token}`"),
                        });
                    }
                };
                match chars.next() {
                    Some((_, ']')) => {}
                    _ => {
                        return Err(NameError { msg: format!("missing `]` in `{token}`") });
                    }
                }
                name = ast.array_index(name, ast.number(index));
            }
            _ => {
                return Err(NameError {
                    msg: format!("unexpected character `{c}` at column {pos} in `{token}`"),
                });
            }
        }
    }

    Ok(name)
}

fn lex_ident<'t>(
    token: &'t str,
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
) -> Option<&'t str> {
    let &(start, first) = chars.peek()?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return None;
    }
    let mut end = start;
    while let Some(&(pos, c)) = chars.peek() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '#' || c == '-' {
            end = pos + c.len_utf8();
            chars.next();
        } else {
            break;
        }
    }
    Some(&token[start..end])
}

fn lex_number(chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>) -> i64 {
    let mut value = 0i64;
    while let Some(&(_, c)) = chars.peek() {
        if let Some(digit) = c.to_digit(10) {
            value = value.saturating_mul(10).saturating_add(i64::from(digit));
            chars.next();
        } else {
            break;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use smv_ast::Arena;

    #[test]
    fn qualified_names() {
        let arena = Arena::new();
        let ast = Ast::new(&arena);
        assert_eq!(lex_name(&ast, "x").ok(), Some(ast.atom("x")));
        assert_eq!(lex_name(&ast, "m.x").ok(), Some(ast.dot(ast.atom("m"), ast.atom("x"))));
        assert_eq!(lex_name(&ast, "x.3").ok(), Some(ast.bit(ast.atom("x"), 3)));
        assert_eq!(
            lex_name(&ast, "a[2]").ok(),
            Some(ast.array_index(ast.atom("a"), ast.number(2)))
        );
        assert_eq!(
            lex_name(&ast, "m.a[2].b.0").ok(),
            Some(ast.bit(
                ast.dot(ast.array_index(ast.dot(ast.atom("m"), ast.atom("a")), ast.number(2)),
                    ast.atom("b")),
                0
            ))
        );
    }

    #[test]
    fn errors() {
        let arena = Arena::new();
        let ast = Ast::new(&arena);
        assert!(lex_name(&ast, "3x").is_err());
        assert!(lex_name(&ast, "a[").is_err());
        assert!(lex_name(&ast, "a[2").is_err());
        assert!(lex_name(&ast, "a.").is_err());
        assert!(lex_name(&ast, "a,b").is_err());
    }
}
