//! Type-directed parser for data literals
//!
//! A literal is parsed against an expected type from the module's type table:
//!
//! ```text
//! factor := INT | FLOAT | STRING | nil | '-' factor
//!         | '[' elems ']' | IDENT '{' elems '}'
//! elems  := ( factor ( ',' | LINEFEED ) )* factor?
//! ```
//!
//! Struct literals may leave out trailing fields whose type has a zero value
//! (`Int`, `Float`, `Nil`). Elements beyond the declared fields are parsed
//! and thrown away.

use kelp_vm_bytecode::{TypeContext, TypeDescriptor, TypeIndex, TypeKind};
use tracing::{debug, trace};

use crate::config::ParserConfig;
use crate::error::{ParseError, Result};
use crate::heap::Heap;
use crate::lexer::{Lexer, Token};
use crate::value::Value;

/// Element typing of an aggregate being parsed
#[derive(Clone, Copy)]
enum Elems<'t> {
    /// Every element has this type
    Vector(TypeIndex),
    /// Positional field types
    Struct(&'t [TypeIndex]),
}

/// Parses one literal text into a [`Value`].
///
/// Every heap object the parser builds is recorded in its allocation roster.
/// On success the roster is cleared without touching the result; on failure
/// the roster is released before the error is returned, so a failed parse
/// never leaks.
pub struct ValueParser<'a> {
    lexer: Lexer<'a>,
    token: Token,
    line: u32,
    ctx: &'a TypeContext<'a>,
    heap: &'a Heap,
    config: ParserConfig,
    depth: usize,
    allocated: Vec<Value>,
}

impl<'a> ValueParser<'a> {
    /// Create a parser over `text`
    pub fn new(ctx: &'a TypeContext<'a>, heap: &'a Heap, text: &'a str) -> Self {
        Self::with_config(ctx, heap, text, ParserConfig::default())
    }

    /// Create a parser with custom settings
    pub fn with_config(ctx: &'a TypeContext<'a>, heap: &'a Heap, text: &'a str, config: ParserConfig) -> Self {
        Self {
            lexer: Lexer::new(text),
            token: Token::EndOfFile,
            line: 1,
            ctx,
            heap,
            config,
            depth: 0,
            allocated: Vec::new(),
        }
    }

    /// Parse the whole text as one value of type `ty`
    pub fn parse(mut self, ty: TypeIndex) -> Result<Value> {
        match self.parse_top(ty) {
            Ok(value) => {
                self.disown();
                Ok(value)
            }
            Err(e) => {
                self.release_all();
                Err(e)
            }
        }
    }

    fn parse_top(&mut self, ty: TypeIndex) -> Result<Value> {
        self.advance()?;
        let value = self.parse_factor(ty)?;
        self.gobble(&Token::Linefeed)?;
        self.expect(&Token::EndOfFile)?;
        Ok(value)
    }

    /// Forget the roster; the returned value now holds the only references.
    fn disown(&mut self) {
        let count = self.allocated.len();
        self.allocated.clear();
        trace!(objects = count, "literal parsed");
    }

    /// Release every rostered object exactly once.
    fn release_all(&mut self) {
        let count = self.allocated.len();
        for value in self.allocated.drain(..) {
            drop(value);
        }
        trace!(objects = count, live = self.heap.live_objects(), "released partial literal");
    }

    fn track(&mut self, value: Value) -> Value {
        self.allocated.push(value.clone());
        value
    }

    fn parse_factor(&mut self, ty: TypeIndex) -> Result<Value> {
        self.depth += 1;
        let result = if self.depth > self.config.max_depth {
            Err(self.error("nesting too deep"))
        } else {
            self.parse_factor_inner(ty)
        };
        self.depth -= 1;
        result
    }

    fn parse_factor_inner(&mut self, ty: TypeIndex) -> Result<Value> {
        let ctx = self.ctx;
        let descriptor = ctx
            .descriptor(ty)
            .ok_or_else(|| self.error(format!("unknown type index {ty}")))?;
        let kind = descriptor.kind();

        match &self.token {
            Token::Int(i) => {
                let value = Value::Int(*i);
                self.expect_type(TypeKind::Int, kind)?;
                self.advance()?;
                Ok(value)
            }

            Token::Float(f) => {
                let value = Value::Float(*f);
                self.expect_type(TypeKind::Float, kind)?;
                self.advance()?;
                Ok(value)
            }

            Token::Str(s) => {
                let text = s.clone();
                self.expect_type(TypeKind::String, kind)?;
                self.advance()?;
                let value = self.heap.new_string(text);
                Ok(self.track(value))
            }

            Token::Nil => {
                self.expect_type(TypeKind::Nil, kind)?;
                self.advance()?;
                Ok(Value::Nil)
            }

            Token::Minus => {
                self.advance()?;
                let mut value = self.parse_factor(ty)?;
                let negatable = kind.is_numeric() || kind == TypeKind::Any;
                if !(negatable && value.negate()) {
                    return Err(self.error("unary minus: numeric value expected"));
                }
                Ok(value)
            }

            Token::LeftBracket => {
                self.expect_type(TypeKind::Vector, kind)?;
                self.advance()?;
                let (vec_ty, element) = match descriptor {
                    TypeDescriptor::Vector { element } => (ty, *element),
                    _ => (TypeIndex::VECTOR_ANY, TypeIndex::ANY),
                };
                self.parse_elems(&Token::RightBracket, vec_ty, Elems::Vector(element))
            }

            Token::Ident(name) => {
                let given = name.clone();
                self.expect_type(TypeKind::Struct, kind)?;
                self.advance()?;
                self.expect(&Token::LeftCurly)?;

                let struct_ty = match descriptor {
                    TypeDescriptor::Struct { struct_id, .. } => {
                        let expected = ctx.struct_name(*struct_id).unwrap_or_default();
                        if expected != given {
                            return Err(self.error(format!(
                                "struct type `{expected}` required, `{given}` given"
                            )));
                        }
                        ty
                    }
                    _ => ctx
                        .struct_type_by_name(&given)
                        .ok_or_else(|| self.error(format!("unknown struct type `{given}`")))?,
                };
                let fields = match ctx.descriptor(struct_ty) {
                    Some(TypeDescriptor::Struct { fields, .. }) => fields.as_slice(),
                    _ => return Err(self.error(format!("`{given}` is not a struct type"))),
                };
                self.parse_elems(&Token::RightCurly, struct_ty, Elems::Struct(fields))
            }

            other => Err(self.error(format!("illegal start of expression: `{other}`"))),
        }
    }

    fn parse_elems(&mut self, end: &Token, ty: TypeIndex, elem_types: Elems<'a>) -> Result<Value> {
        self.gobble(&Token::Linefeed)?;
        let mut elems = Vec::new();

        if self.token == *end {
            self.advance()?;
        } else {
            loop {
                match elem_types {
                    Elems::Vector(element) => elems.push(self.parse_factor(element)?),
                    Elems::Struct(fields) => match fields.get(elems.len()) {
                        Some(&field) => elems.push(self.parse_factor(field)?),
                        None => {
                            self.parse_factor(TypeIndex::ANY)?;
                        }
                    },
                }
                let has_linefeed = self.token == Token::Linefeed;
                if has_linefeed {
                    self.advance()?;
                }
                if self.token == *end {
                    break;
                }
                if !has_linefeed {
                    self.expect(&Token::Comma)?;
                }
            }
            self.advance()?;
        }

        if let Elems::Struct(fields) = elem_types {
            for &field in &fields[elems.len()..] {
                let default = match self.ctx.types().kind(field) {
                    Some(TypeKind::Int) => Value::Int(0),
                    Some(TypeKind::Float) => Value::Float(0.0),
                    Some(TypeKind::Nil) => Value::Nil,
                    _ => return Err(ParseError::DefaultingImpossible { line: self.line }),
                };
                elems.push(default);
            }
        }

        let value = self.heap.new_vector(ty, elems);
        Ok(self.track(value))
    }

    fn expect_type(&self, given: TypeKind, needed: TypeKind) -> Result<()> {
        if needed == given || needed == TypeKind::Any {
            return Ok(());
        }
        Err(self.error(format!("type `{needed}` required, `{given}` given")))
    }

    fn expect(&mut self, token: &Token) -> Result<()> {
        if self.token != *token {
            return Err(self.error(format!("`{token}` expected, found: `{}`", self.token)));
        }
        self.advance()
    }

    fn gobble(&mut self, token: &Token) -> Result<()> {
        if self.token == *token {
            self.advance()?;
        }
        Ok(())
    }

    fn advance(&mut self) -> Result<()> {
        let next = self.lexer.next_token()?;
        self.token = next.token;
        self.line = next.line;
        Ok(())
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::syntax(self.line, message)
    }
}

/// Parse `text` as a value of type `ty`
pub fn parse_value(ctx: &TypeContext<'_>, heap: &Heap, ty: TypeIndex, text: &str) -> Result<Value> {
    ValueParser::new(ctx, heap, text).parse(ty)
}

/// Parse `text` as a value of type `ty`, reporting failure in-band.
///
/// Returns the value and `None`, or nil and the error message.
pub fn parse_data(ctx: &TypeContext<'_>, heap: &Heap, ty: TypeIndex, text: &str) -> (Value, Option<String>) {
    match parse_value(ctx, heap, ty, text) {
        Ok(value) => (value, None),
        Err(e) => {
            debug!(error = %e, "data literal rejected");
            (Value::Nil, Some(e.to_string()))
        }
    }
}
