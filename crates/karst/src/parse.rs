//! The parser: tokens to heap-allocated AST values.
//!
//! Lists are read element-first; once a list closes, the form recognizer
//! decides what it was. A head symbol naming a special form or builtin
//! produces a typed `Primitive` node (or a `Lambda`/`Quote` node directly);
//! any other head symbol produces an application of that name; a head that is
//! already a callable node produces an application of it; everything else is
//! a literal pair chain.
//!
//! Exactly one expression is parsed per call, and any trailing token is a
//! syntax error.

use std::str::FromStr;

use smallvec::SmallVec;

use crate::{
    builtins::Builtin,
    exception::{Exception, RunResult},
    heap::{Apply, Formals, Heap, HeapData, Lambda, Pair, Primitive},
    intern::{Interns, StringId},
    lexer::{Lexer, Token},
    value::Value,
};

/// Parses `source` as a single expression, allocating AST nodes in `heap`.
pub(crate) fn parse_single(source: &str, heap: &mut Heap, interns: &mut Interns) -> RunResult<Value> {
    let mut parser = Parser {
        lexer: Lexer::new(source),
        heap,
        interns,
    };
    if parser.lexer.is_end() {
        return Err(Exception::syntax("no expression given"));
    }
    let value = parser.read_expr()?;
    if !parser.lexer.is_end() {
        return Err(Exception::syntax("expected exactly one expression"));
    }
    Ok(value)
}

struct Parser<'src, 'sess> {
    lexer: Lexer<'src>,
    heap: &'sess mut Heap,
    interns: &'sess mut Interns,
}

impl Parser<'_, '_> {
    fn read_expr(&mut self) -> RunResult<Value> {
        match self.lexer.peek()? {
            Token::OpenParen => {
                self.lexer.advance()?;
                if self.lexer.peek()? == Token::CloseParen {
                    self.lexer.advance()?;
                    return Ok(Value::Nil);
                }
                let value = self.read_list()?;
                // read_list leaves the closing bracket for us.
                self.lexer.advance()?;
                Ok(value)
            }
            Token::CloseParen => Err(Exception::syntax("unexpected ')'")),
            Token::Dot => Err(Exception::syntax("'.' is only valid between the two elements of a pair")),
            Token::Quote => {
                self.lexer.advance()?;
                let payload = self.read_expr()?;
                Ok(Value::Ref(self.heap.alloc(HeapData::Quote(payload))))
            }
            Token::Symbol(name) => {
                self.lexer.advance()?;
                match name.as_str() {
                    "#t" => Ok(Value::Bool(true)),
                    "#f" => Ok(Value::Bool(false)),
                    _ => Ok(Value::Symbol(self.interns.intern(&name))),
                }
            }
            Token::Constant(value) => {
                self.lexer.advance()?;
                Ok(Value::Int(value))
            }
        }
    }

    /// Reads the elements of a non-empty list up to (not including) the
    /// closing bracket, then hands them to the form recognizer.
    fn read_list(&mut self) -> RunResult<Value> {
        let mut items: Vec<Value> = Vec::new();
        loop {
            if self.lexer.is_end() {
                return Err(Exception::syntax("expected ')' to close the list"));
            }
            match self.lexer.peek()? {
                Token::CloseParen => break,
                Token::Dot => {
                    self.lexer.advance()?;
                    if items.len() != 1 {
                        return Err(Exception::syntax("'.' is only valid between the two elements of a pair"));
                    }
                    let cdr = self.read_expr()?;
                    if self.lexer.is_end() || self.lexer.peek()? != Token::CloseParen {
                        return Err(Exception::syntax("expected ')' after the tail of a pair"));
                    }
                    let id = self.heap.alloc(HeapData::Pair(Pair { car: items[0], cdr }));
                    return Ok(Value::Ref(id));
                }
                _ => items.push(self.read_expr()?),
            }
        }
        self.recognize_form(items)
    }

    /// Decides what a closed list was: a special form, a builtin call, an
    /// application, or a literal pair chain.
    fn recognize_form(&mut self, items: Vec<Value>) -> RunResult<Value> {
        let head = items[0];

        // The operator position is itself an already-resolved callable node:
        // wrap it in an application rather than dispatching a keyword.
        if let Value::Ref(id) = head
            && matches!(
                self.heap.get(id),
                HeapData::Lambda(_) | HeapData::Primitive(_) | HeapData::Apply(_)
            )
        {
            let call = Apply {
                target: head,
                args: items[1..].to_vec(),
            };
            return Ok(Value::Ref(self.heap.alloc(HeapData::Apply(call))));
        }

        let Value::Symbol(name_id) = head else {
            // A literal list shape, e.g. `(1 2 3)`.
            return Ok(self.heap.alloc_list(&items));
        };

        let name = self.interns.get(name_id);
        if name == "quote" {
            if items.len() != 2 {
                return Err(Exception::syntax("'quote' expects exactly one argument"));
            }
            return Ok(Value::Ref(self.heap.alloc(HeapData::Quote(items[1]))));
        }
        if name == "lambda" {
            return self.build_lambda(&items);
        }
        if let Ok(op) = Builtin::from_str(name) {
            let mut args = items[1..].to_vec();
            if op == Builtin::Define
                && let Some(&target) = args.first()
                && let Some(names) = self.formals_names(target)
            {
                // Function shorthand `(define (name params...) body...)`:
                // replace the application node with a parameter list and
                // check the body shape now.
                let body_len = args.len() - 1;
                if body_len == 0 || body_len > 2 {
                    return Err(Exception::syntax(
                        "a function body takes one expression with an optional leading definition",
                    ));
                }
                args[0] = Value::Ref(self.heap.alloc(HeapData::Formals(Formals::new(names))));
            }
            return Ok(Value::Ref(self.heap.alloc(HeapData::Primitive(Primitive { op, args }))));
        }

        // An application of a user-defined name.
        let call = Apply {
            target: head,
            args: items[1..].to_vec(),
        };
        Ok(Value::Ref(self.heap.alloc(HeapData::Apply(call))))
    }

    fn build_lambda(&mut self, items: &[Value]) -> RunResult<Value> {
        if items.len() < 3 {
            return Err(Exception::syntax("'lambda' expects a parameter list and a body"));
        }
        let Some(names) = self.formals_names(items[1]) else {
            return Err(Exception::syntax("'lambda' expects a parameter list of symbols"));
        };
        if items.len() - 2 > 2 {
            return Err(Exception::syntax(
                "a lambda body takes one expression with an optional leading definition",
            ));
        }
        let formals = self.heap.alloc(HeapData::Formals(Formals::new(names)));
        let body: SmallVec<[Value; 2]> = items[2..].iter().copied().collect();
        let lambda = Lambda {
            formals,
            body,
            captured: None,
        };
        Ok(Value::Ref(self.heap.alloc(HeapData::Lambda(lambda))))
    }

    /// Reinterprets an already-read element as a parameter list: `()` or a
    /// parenthesized run of symbols (which reads as an application node).
    fn formals_names(&self, value: Value) -> Option<Vec<StringId>> {
        match value {
            Value::Nil => Some(Vec::new()),
            Value::Ref(id) => {
                let HeapData::Apply(call) = self.heap.get(id) else {
                    return None;
                };
                let Value::Symbol(first) = call.target else {
                    return None;
                };
                let mut names = vec![first];
                for &arg in &call.args {
                    let Value::Symbol(name) = arg else {
                        return None;
                    };
                    names.push(name);
                }
                Some(names)
            }
            _ => None,
        }
    }
}
