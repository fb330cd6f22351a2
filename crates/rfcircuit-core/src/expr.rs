//! Complex-valued expressions in the Laplace variable `s`
//!
//! Two-port entries built symbolically are trees of [`Expr`] nodes sharing
//! subtrees through `Rc`. Construction through the arithmetic operators folds
//! constants and drops neutral elements, so ladders of numeric components
//! stay compact. Expressions can also be parsed from text:
//!
//! ```
//! use num_complex::Complex64;
//! use rfcircuit_core::expr::Expr;
//!
//! let z: Expr = "1/(s*1e-12) + 50".parse().unwrap();
//! let v = z.eval(Complex64::new(0.0, 1e12)).unwrap();
//! assert!((v.re - 50.0).abs() < 1e-9);
//! assert!((v.im + 1.0).abs() < 1e-9);
//! ```

use std::f64::consts::PI;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::rc::Rc;
use std::str::FromStr;

use num_complex::Complex64;

use crate::error::{EvalError, ExprError};

/// Elementary functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Sqrt,
    Exp,
    Ln,
    Sin,
    Cos,
    Tan,
    Atan,
}

impl Func {
    fn from_name(name: &str) -> Option<Func> {
        let f = match name {
            "sqrt" => Func::Sqrt,
            "exp" => Func::Exp,
            "ln" | "log" => Func::Ln,
            "sin" => Func::Sin,
            "cos" => Func::Cos,
            "tan" => Func::Tan,
            "atan" => Func::Atan,
            _ => return None,
        };
        Some(f)
    }

    pub fn name(self) -> &'static str {
        match self {
            Func::Sqrt => "sqrt",
            Func::Exp => "exp",
            Func::Ln => "ln",
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tan => "tan",
            Func::Atan => "atan",
        }
    }

    fn apply(self, z: Complex64) -> Complex64 {
        match self {
            Func::Sqrt => z.sqrt(),
            Func::Exp => z.exp(),
            Func::Ln => z.ln(),
            Func::Sin => z.sin(),
            Func::Cos => z.cos(),
            Func::Tan => z.tan(),
            Func::Atan => z.atan(),
        }
    }
}

/// Expression tree node
#[derive(Debug, Clone, PartialEq)]
pub enum ExprNode {
    Const(Complex64),
    /// The Laplace variable
    S,
    /// Free symbol; evaluation fails with `UnboundVariable`
    Var(String),
    Neg(Expr),
    Add(Expr, Expr),
    Sub(Expr, Expr),
    Mul(Expr, Expr),
    Div(Expr, Expr),
    Pow(Expr, Expr),
    Call(Func, Expr),
}

/// Shared handle to an expression tree
#[derive(Debug, Clone, PartialEq)]
pub struct Expr(Rc<ExprNode>);

impl Expr {
    fn node(node: ExprNode) -> Expr {
        Expr(Rc::new(node))
    }

    pub fn constant(value: Complex64) -> Expr {
        Expr::node(ExprNode::Const(value))
    }

    pub fn real(value: f64) -> Expr {
        Expr::constant(Complex64::new(value, 0.0))
    }

    pub fn zero() -> Expr {
        Expr::real(0.0)
    }

    pub fn one() -> Expr {
        Expr::real(1.0)
    }

    /// The imaginary unit
    pub fn j() -> Expr {
        Expr::constant(Complex64::new(0.0, 1.0))
    }

    /// The complex frequency `s`
    pub fn s() -> Expr {
        Expr::node(ExprNode::S)
    }

    pub fn var(name: impl Into<String>) -> Expr {
        Expr::node(ExprNode::Var(name.into()))
    }

    pub fn kind(&self) -> &ExprNode {
        &self.0
    }

    /// Constant value, if the expression folded to one
    pub fn as_const(&self) -> Option<Complex64> {
        match *self.0 {
            ExprNode::Const(c) => Some(c),
            _ => None,
        }
    }

    fn is_const(&self, value: f64) -> bool {
        self.as_const() == Some(Complex64::new(value, 0.0))
    }

    pub fn pow(&self, exponent: &Expr) -> Expr {
        match (self.as_const(), exponent.as_const()) {
            (_, Some(e)) if e == Complex64::new(1.0, 0.0) => self.clone(),
            (Some(b), Some(e)) => fold(powc(b, e), || Expr::node(ExprNode::Pow(self.clone(), exponent.clone()))),
            _ => Expr::node(ExprNode::Pow(self.clone(), exponent.clone())),
        }
    }

    pub fn call(func: Func, arg: &Expr) -> Expr {
        match arg.as_const() {
            Some(c) => fold(func.apply(c), || Expr::node(ExprNode::Call(func, arg.clone()))),
            None => Expr::node(ExprNode::Call(func, arg.clone())),
        }
    }

    pub fn sin(&self) -> Expr {
        Expr::call(Func::Sin, self)
    }

    pub fn cos(&self) -> Expr {
        Expr::call(Func::Cos, self)
    }

    pub fn tan(&self) -> Expr {
        Expr::call(Func::Tan, self)
    }

    /// True if the expression contains `s`
    pub fn depends_on_s(&self) -> bool {
        match &*self.0 {
            ExprNode::S => true,
            ExprNode::Const(_) | ExprNode::Var(_) => false,
            ExprNode::Neg(a) | ExprNode::Call(_, a) => a.depends_on_s(),
            ExprNode::Add(a, b)
            | ExprNode::Sub(a, b)
            | ExprNode::Mul(a, b)
            | ExprNode::Div(a, b)
            | ExprNode::Pow(a, b) => a.depends_on_s() || b.depends_on_s(),
        }
    }

    /// Evaluate with `s` bound to the given complex frequency
    pub fn eval(&self, s: Complex64) -> Result<Complex64, EvalError> {
        let value = match &*self.0 {
            ExprNode::Const(c) => *c,
            ExprNode::S => s,
            ExprNode::Var(name) => return Err(EvalError::UnboundVariable(name.clone())),
            ExprNode::Neg(a) => -a.eval(s)?,
            ExprNode::Add(a, b) => a.eval(s)? + b.eval(s)?,
            ExprNode::Sub(a, b) => a.eval(s)? - b.eval(s)?,
            ExprNode::Mul(a, b) => a.eval(s)? * b.eval(s)?,
            ExprNode::Div(a, b) => {
                let num = a.eval(s)?;
                let den = b.eval(s)?;
                if den.norm() == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                num / den
            }
            ExprNode::Pow(a, b) => powc(a.eval(s)?, b.eval(s)?),
            ExprNode::Call(func, a) => func.apply(a.eval(s)?),
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(EvalError::NonFinite)
        }
    }

    /// Evaluate at a real frequency in Hz (`s = j 2π f`)
    pub fn eval_at(&self, f_hz: f64) -> Result<Complex64, EvalError> {
        self.eval(Complex64::new(0.0, 2.0 * PI * f_hz))
    }

    fn precedence(&self) -> u8 {
        match &*self.0 {
            ExprNode::Add(..) | ExprNode::Sub(..) => 1,
            ExprNode::Mul(..) | ExprNode::Div(..) => 2,
            ExprNode::Neg(_) => 3,
            ExprNode::Const(c) if c.im == 0.0 && c.re < 0.0 => 3,
            ExprNode::Pow(..) => 4,
            _ => 5,
        }
    }
}

/// Integer exponents use repeated multiplication to stay exact
fn powc(base: Complex64, exponent: Complex64) -> Complex64 {
    if exponent.im == 0.0 && exponent.re.fract() == 0.0 && exponent.re.abs() <= 64.0 {
        base.powi(exponent.re as i32)
    } else {
        base.powc(exponent)
    }
}

/// Keep a folded constant only if it is finite
fn fold(value: Complex64, symbolic: impl FnOnce() -> Expr) -> Expr {
    if value.is_finite() {
        Expr::constant(value)
    } else {
        symbolic()
    }
}

impl Add for &Expr {
    type Output = Expr;

    fn add(self, rhs: &Expr) -> Expr {
        match (self.as_const(), rhs.as_const()) {
            (Some(a), Some(b)) => Expr::constant(a + b),
            _ if self.is_const(0.0) => rhs.clone(),
            _ if rhs.is_const(0.0) => self.clone(),
            _ => Expr::node(ExprNode::Add(self.clone(), rhs.clone())),
        }
    }
}

impl Sub for &Expr {
    type Output = Expr;

    fn sub(self, rhs: &Expr) -> Expr {
        match (self.as_const(), rhs.as_const()) {
            (Some(a), Some(b)) => Expr::constant(a - b),
            _ if rhs.is_const(0.0) => self.clone(),
            _ if self.is_const(0.0) => -rhs,
            _ => Expr::node(ExprNode::Sub(self.clone(), rhs.clone())),
        }
    }
}

impl Mul for &Expr {
    type Output = Expr;

    fn mul(self, rhs: &Expr) -> Expr {
        match (self.as_const(), rhs.as_const()) {
            (Some(a), Some(b)) => Expr::constant(a * b),
            _ if self.is_const(0.0) || rhs.is_const(0.0) => Expr::zero(),
            _ if self.is_const(1.0) => rhs.clone(),
            _ if rhs.is_const(1.0) => self.clone(),
            _ => Expr::node(ExprNode::Mul(self.clone(), rhs.clone())),
        }
    }
}

impl Div for &Expr {
    type Output = Expr;

    fn div(self, rhs: &Expr) -> Expr {
        match (self.as_const(), rhs.as_const()) {
            (Some(a), Some(b)) => fold(a / b, || Expr::node(ExprNode::Div(self.clone(), rhs.clone()))),
            _ if rhs.is_const(1.0) => self.clone(),
            _ => Expr::node(ExprNode::Div(self.clone(), rhs.clone())),
        }
    }
}

impl Neg for &Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        match (self.as_const(), &*self.0) {
            (Some(c), _) => Expr::constant(-c),
            (None, ExprNode::Neg(inner)) => inner.clone(),
            _ => Expr::node(ExprNode::Neg(self.clone())),
        }
    }
}

macro_rules! forward_owned_binop {
    ($($trait:ident :: $method:ident),*) => {$(
        impl $trait for Expr {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                $trait::$method(&self, &rhs)
            }
        }
    )*};
}

forward_owned_binop!(Add::add, Sub::sub, Mul::mul, Div::div);

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        -&self
    }
}

impl From<f64> for Expr {
    fn from(v: f64) -> Self {
        Expr::real(v)
    }
}

impl From<Complex64> for Expr {
    fn from(v: Complex64) -> Self {
        Expr::constant(v)
    }
}

fn write_number(f: &mut fmt::Formatter<'_>, c: Complex64) -> fmt::Result {
    match (c.re, c.im) {
        (re, im) if im == 0.0 => write!(f, "{re}"),
        (re, im) if re == 0.0 && im == 1.0 => write!(f, "j"),
        (re, im) if re == 0.0 => write!(f, "({im}*j)"),
        (re, im) if im < 0.0 => write!(f, "({re} - {}*j)", -im),
        (re, im) => write!(f, "({re} + {im}*j)"),
    }
}

impl Expr {
    fn write_operand(&self, f: &mut fmt::Formatter<'_>, min_prec: u8) -> fmt::Result {
        if self.precedence() < min_prec {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            ExprNode::Const(c) => write_number(f, *c),
            ExprNode::S => f.write_str("s"),
            ExprNode::Var(name) => f.write_str(name),
            ExprNode::Neg(a) => {
                f.write_str("-")?;
                a.write_operand(f, 4)
            }
            ExprNode::Add(a, b) => {
                a.write_operand(f, 1)?;
                f.write_str(" + ")?;
                b.write_operand(f, 2)
            }
            ExprNode::Sub(a, b) => {
                a.write_operand(f, 1)?;
                f.write_str(" - ")?;
                b.write_operand(f, 2)
            }
            ExprNode::Mul(a, b) => {
                a.write_operand(f, 2)?;
                f.write_str("*")?;
                b.write_operand(f, 3)
            }
            ExprNode::Div(a, b) => {
                a.write_operand(f, 2)?;
                f.write_str("/")?;
                b.write_operand(f, 4)
            }
            ExprNode::Pow(a, b) => {
                a.write_operand(f, 5)?;
                f.write_str("^")?;
                b.write_operand(f, 5)
            }
            ExprNode::Call(func, a) => write!(f, "{}({a})", func.name()),
        }
    }
}

// ============================================================================
// Parser
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
}

fn tokenize(text: &str) -> Result<Vec<(Token, usize)>, ExprError> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() || c == '.' {
            let start = i;
            while i < chars.len() && (chars[i].1.is_ascii_digit() || chars[i].1 == '.') {
                i += 1;
            }
            // exponent: e/E followed by an optional sign and digits
            if i < chars.len() && matches!(chars[i].1, 'e' | 'E') {
                let mut k = i + 1;
                if k < chars.len() && matches!(chars[k].1, '+' | '-') {
                    k += 1;
                }
                if k < chars.len() && chars[k].1.is_ascii_digit() {
                    while k < chars.len() && chars[k].1.is_ascii_digit() {
                        k += 1;
                    }
                    i = k;
                }
            }
            let end = chars.get(i).map_or(text.len(), |&(p, _)| p);
            let literal = &text[chars[start].0..end];
            let value = literal.parse::<f64>().map_err(|_| ExprError::UnexpectedToken {
                token: literal.to_string(),
                position: pos,
            })?;
            tokens.push((Token::Number(value), pos));
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].1.is_alphanumeric() || chars[i].1 == '_') {
                i += 1;
            }
            let end = chars.get(i).map_or(text.len(), |&(p, _)| p);
            tokens.push((Token::Ident(text[chars[start].0..end].to_string()), pos));
        } else if c == '*' && chars.get(i + 1).map(|&(_, n)| n) == Some('*') {
            tokens.push((Token::Op('^'), pos));
            i += 2;
        } else {
            let token = match c {
                '+' | '-' | '*' | '/' | '^' => Token::Op(c),
                '(' => Token::LParen,
                ')' => Token::RParen,
                _ => {
                    return Err(ExprError::UnexpectedToken {
                        token: c.to_string(),
                        position: pos,
                    })
                }
            };
            tokens.push((token, pos));
            i += 1;
        }
    }
    Ok(tokens)
}

/// Recursive-descent parser
///
/// ```text
/// expr    := term (('+' | '-') term)*
/// term    := unary (('*' | '/') unary | primary)*
/// unary   := ('-' | '+') unary | power
/// power   := primary ('^' unary)?
/// primary := number | ident | ident '(' expr ')' | '(' expr ')'
/// ```
///
/// Juxtaposition multiplies (`2s`, `2(s+1)`).
struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn next(&mut self) -> Option<(Token, usize)> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn unexpected(&self) -> ExprError {
        match self.tokens.get(self.pos) {
            Some((t, p)) => ExprError::UnexpectedToken {
                token: describe(t),
                position: *p,
            },
            None => ExprError::UnexpectedEnd,
        }
    }

    fn expr(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek() {
            let op = *op;
            self.pos += 1;
            let rhs = self.term()?;
            lhs = if op == '+' { &lhs + &rhs } else { &lhs - &rhs };
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Op(op @ ('*' | '/'))) => {
                    let op = *op;
                    self.pos += 1;
                    let rhs = self.unary()?;
                    lhs = if op == '*' { &lhs * &rhs } else { &lhs / &rhs };
                }
                Some(Token::Number(_) | Token::Ident(_) | Token::LParen) => {
                    let rhs = self.power()?;
                    lhs = &lhs * &rhs;
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Expr, ExprError> {
        let base = self.primary()?;
        if let Some(Token::Op('^')) = self.peek() {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(base.pow(&exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let Some((token, position)) = self.next() else {
            return Err(ExprError::UnexpectedEnd);
        };
        match token {
            Token::Number(v) => Ok(Expr::real(v)),
            Token::LParen => {
                let inner = self.expr()?;
                self.expect_rparen()?;
                Ok(inner)
            }
            Token::Ident(name) => {
                if let Some(Token::LParen) = self.peek() {
                    let func = Func::from_name(&name).ok_or(ExprError::UnknownFunction(name))?;
                    self.pos += 1;
                    let arg = self.expr()?;
                    self.expect_rparen()?;
                    return Ok(Expr::call(func, &arg));
                }
                Ok(match name.as_str() {
                    "s" => Expr::s(),
                    "j" | "I" => Expr::j(),
                    "pi" => Expr::real(PI),
                    _ => Expr::var(name),
                })
            }
            other => Err(ExprError::UnexpectedToken {
                token: describe(&other),
                position,
            }),
        }
    }

    fn expect_rparen(&mut self) -> Result<(), ExprError> {
        match self.peek() {
            Some(Token::RParen) => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(self.unexpected()),
        }
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Number(v) => v.to_string(),
        Token::Ident(s) => s.clone(),
        Token::Op(c) => c.to_string(),
        Token::LParen => "(".to_string(),
        Token::RParen => ")".to_string(),
    }
}

impl FromStr for Expr {
    type Err = ExprError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut parser = Parser {
            tokens: tokenize(text)?,
            pos: 0,
        };
        let expr = parser.expr()?;
        if parser.pos < parser.tokens.len() {
            return Err(parser.unexpected());
        }
        Ok(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn test_constant_folding() {
        let e: Expr = "2*3 + 4^2 - 1".parse().unwrap();
        assert_eq!(e.as_const(), Some(c(21.0, 0.0)));

        let s = Expr::s();
        assert_eq!(&s * &Expr::one(), s);
        assert_eq!((&s * &Expr::zero()).as_const(), Some(c(0.0, 0.0)));
        assert_eq!(&Expr::zero() + &s, s);
        assert_eq!(-(-&s), s);
    }

    #[test]
    fn test_series_rlc_impedance() {
        // Z = R + sL + 1/(sC) at resonance is purely resistive
        let z: Expr = "50 + s*1e-9 + 1/(s*1e-12)".parse().unwrap();
        let f0 = 1.0 / (2.0 * PI * (1e-9f64 * 1e-12).sqrt());
        let v = z.eval_at(f0).unwrap();
        assert_relative_eq!(v.re, 50.0, epsilon = 1e-9);
        assert_relative_eq!(v.im, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_imaginary_unit_and_functions() {
        let e: Expr = "exp(j*pi) + sqrt(4) + I^2".parse().unwrap();
        let v = e.eval(c(0.0, 0.0)).unwrap();
        assert_relative_eq!(v.re, 0.0, epsilon = 1e-12);
        assert_relative_eq!(v.im, 0.0, epsilon = 1e-12);

        let t: Expr = "tan(s) - sin(s)/cos(s) + atan(0) + ln(1)".parse().unwrap();
        assert_relative_eq!(t.eval(c(0.3, 0.1)).unwrap().norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_precedence_and_juxtaposition() {
        let e: Expr = "-2^2".parse().unwrap();
        assert_eq!(e.as_const(), Some(c(-4.0, 0.0)));
        let e: Expr = "2^3^2".parse().unwrap();
        assert_eq!(e.as_const(), Some(c(512.0, 0.0)));
        let e: Expr = "2s + 3(s+1)".parse().unwrap();
        assert_relative_eq!(e.eval(c(1.0, 0.0)).unwrap().re, 8.0, epsilon = 1e-12);
        let e: Expr = "s**2".parse().unwrap();
        assert_relative_eq!(e.eval(c(3.0, 0.0)).unwrap().re, 9.0, epsilon = 1e-12);
    }

    #[test]
    fn test_display_reparses() {
        let e: Expr = "(s + 1)/(s*(s - 2)) - 3*s^2".parse().unwrap();
        let text = e.to_string();
        let back: Expr = text.parse().unwrap();
        let at = c(0.7, -0.4);
        let (a, b) = (e.eval(at).unwrap(), back.eval(at).unwrap());
        assert_relative_eq!(a.re, b.re, epsilon = 1e-12);
        assert_relative_eq!(a.im, b.im, epsilon = 1e-12);
    }

    #[test]
    fn test_evaluation_failures() {
        let e: Expr = "1/s".parse().unwrap();
        assert_eq!(e.eval(c(0.0, 0.0)), Err(EvalError::DivisionByZero));

        let e: Expr = "x + s".parse().unwrap();
        assert_eq!(e.eval(c(1.0, 0.0)), Err(EvalError::UnboundVariable("x".into())));

        let e: Expr = "exp(s)".parse().unwrap();
        assert_eq!(e.eval(c(1000.0, 0.0)), Err(EvalError::NonFinite));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("1 +".parse::<Expr>(), Err(ExprError::UnexpectedEnd));
        assert_eq!(
            "foo(s)".parse::<Expr>(),
            Err(ExprError::UnknownFunction("foo".into()))
        );
        assert!(matches!(
            "(s + 1".parse::<Expr>(),
            Err(ExprError::UnexpectedEnd)
        ));
        assert!(matches!(
            "s $ 2".parse::<Expr>(),
            Err(ExprError::UnexpectedToken { position: 2, .. })
        ));
    }
}
