use crate::lexer::lex_name;
use smv_ast::{Ast, NodeList};
use smv_interface::Session;
use std::{fs, io, path::Path};

/// The variable-ordering file parser.
///
/// An ordering file is a sequence of qualified names separated by
/// whitespace; `--` starts a comment running to the end of the line.
/// Duplicate names produce a warning and are dropped; lexical errors
/// produce an error and recovery continues with the next token.
pub struct ParserOrd<'r, 'a, 's> {
    ast: &'r Ast<'a>,
    sess: &'s Session,
    vars: NodeList<'a>,
}

impl<'r, 'a, 's> ParserOrd<'r, 'a, 's> {
    /// Creates a parser building names through `ast`.
    pub fn new(ast: &'r Ast<'a>, sess: &'s Session) -> Self {
        Self { ast, sess, vars: NodeList::new() }
    }

    /// Parses the contents of an ordering file.
    pub fn parse_str(&mut self, text: &str) {
        self.parse_named(text, "<string>");
    }

    /// Parses an ordering file from disk.
    pub fn parse_file(&mut self, path: &Path) -> io::Result<()> {
        let text = fs::read_to_string(path)?;
        self.parse_named(&text, &path.display().to_string());
        Ok(())
    }

    fn parse_named(&mut self, text: &str, file: &str) {
        for (lineno, line) in text.lines().enumerate() {
            let lineno = (lineno + 1) as u32;
            let line = match line.split_once("--") {
                Some((before, _)) => before,
                None => line,
            };
            for token in line.split_whitespace() {
                match lex_name(self.ast, token) {
                    Ok(name) => {
                        if self.vars.contains(name) {
                            self.sess
                                .dcx()
                                .warn("variable appears twice in the ordering")
                                .file(file)
                                .line(lineno)
                                .expr(name)
                                .emit();
                        } else {
                            self.vars.push(name);
                        }
                    }
                    Err(err) => {
                        self.sess.dcx().err(err.msg).file(file).line(lineno).emit();
                    }
                }
            }
        }
        debug!(vars = self.vars.len(), file, "parsed ordering");
    }

    /// The names parsed so far, in file order.
    pub fn vars_list(&self) -> &NodeList<'a> {
        &self.vars
    }

    /// Consumes the parser, yielding the parsed names.
    pub fn into_vars_list(self) -> NodeList<'a> {
        self.vars
    }

    /// Forgets everything parsed so far.
    pub fn reset(&mut self) {
        self.vars = NodeList::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smv_ast::Arena;
    use std::io::Write;

    #[test]
    fn parses_names_in_order() {
        let arena = Arena::new();
        let ast = Ast::new(&arena);
        let sess = Session::with_buffer_emitter(Default::default());
        let mut parser = ParserOrd::new(&ast, &sess);
        parser.parse_str("a m.b -- trailing comment\nc[3] d.0\n");
        let vars: Vec<_> = parser.vars_list().iter().collect();
        assert_eq!(
            vars,
            vec![
                ast.atom("a"),
                ast.dot(ast.atom("m"), ast.atom("b")),
                ast.array_index(ast.atom("c"), ast.number(3)),
                ast.bit(ast.atom("d"), 0),
            ]
        );
        assert!(!sess.dcx().has_errors());
    }

    #[test]
    fn duplicates_warn_and_drop() {
        let arena = Arena::new();
        let ast = Ast::new(&arena);
        let sess = Session::with_buffer_emitter(Default::default());
        let mut parser = ParserOrd::new(&ast, &sess);
        parser.parse_str("x y\nx\n");
        assert_eq!(parser.vars_list().len(), 2);
        assert_eq!(sess.dcx().warn_count(), 1);
        assert!(!sess.dcx().has_errors());
        let warning = &sess.dcx().emitted()[0];
        assert_eq!(warning.line, Some(2));
    }

    #[test]
    fn lexical_errors_recover() {
        let arena = Arena::new();
        let ast = Ast::new(&arena);
        let sess = Session::with_buffer_emitter(Default::default());
        let mut parser = ParserOrd::new(&ast, &sess);
        parser.parse_str("a ,b c\n");
        assert_eq!(parser.vars_list().len(), 2);
        assert_eq!(sess.dcx().err_count(), 1);
    }

    #[test]
    fn parses_from_file() {
        let arena = Arena::new();
        let ast = Ast::new(&arena);
        let sess = Session::with_buffer_emitter(Default::default());
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "alpha beta.gamma").unwrap();
        let mut parser = ParserOrd::new(&ast, &sess);
        parser.parse_file(file.path()).unwrap();
        assert_eq!(parser.vars_list().len(), 2);
        parser.reset();
        assert!(parser.vars_list().is_empty());
    }
}
