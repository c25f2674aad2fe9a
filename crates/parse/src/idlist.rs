use crate::lexer::lex_name;
use smv_ast::{Ast, NodeList};
use smv_interface::Session;
use std::{fs, io, path::Path};

/// The identifier-list parser: the same surface as
/// [`ParserOrd`](crate::ParserOrd), but duplicates are kept out silently
/// instead of warned about.
pub struct ParserIdList<'r, 'a, 's> {
    ast: &'r Ast<'a>,
    sess: &'s Session,
    ids: NodeList<'a>,
}

impl<'r, 'a, 's> ParserIdList<'r, 'a, 's> {
    /// Creates a parser building names through `ast`.
    pub fn new(ast: &'r Ast<'a>, sess: &'s Session) -> Self {
        Self { ast, sess, ids: NodeList::new() }
    }

    /// Parses the contents of an identifier list.
    pub fn parse_str(&mut self, text: &str) {
        self.parse_named(text, "<string>");
    }

    /// Parses an identifier list from disk.
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
                        if !self.ids.contains(name) {
                            self.ids.push(name);
                        }
                    }
                    Err(err) => {
                        self.sess.dcx().err(err.msg).file(file).line(lineno).emit();
                    }
                }
            }
        }
        debug!(ids = self.ids.len(), file, "parsed identifier list");
    }

    /// The names parsed so far, in file order.
    pub fn id_list(&self) -> &NodeList<'a> {
        &self.ids
    }

    /// Consumes the parser, yielding the parsed names.
    pub fn into_id_list(self) -> NodeList<'a> {
        self.ids
    }

    /// Forgets everything parsed so far.
    pub fn reset(&mut self) {
        self.ids = NodeList::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smv_ast::Arena;

    #[test]
    fn duplicates_are_silently_unique() {
        let arena = Arena::new();
        let ast = Ast::new(&arena);
        let sess = Session::with_buffer_emitter(Default::default());
        let mut parser = ParserIdList::new(&ast, &sess);
        parser.parse_str("p q p r.s");
        let ids: Vec<_> = parser.id_list().iter().collect();
        assert_eq!(
            ids,
            vec![ast.atom("p"), ast.atom("q"), ast.dot(ast.atom("r"), ast.atom("s"))]
        );
        assert_eq!(sess.dcx().warn_count(), 0);
        assert!(!sess.dcx().has_errors());
    }
}
