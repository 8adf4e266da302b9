use crate::chew::{CommentState, LineState};
use crate::edit::Simplification;
use crate::engine::Engine;
use crate::settings::SymbolsPolicy;
use crate::status::{EngineError, StatusFlags};
use crate::symbols::{symchar, Resolution};

/// Classification the evaluator assigns to each logical line. The
/// first ten feed the if-state transition table; the categorical types
/// are consumed by the conflict handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineType {
    If,
    True,
    False,
    Elif,
    ElTrue,
    ElFalse,
    Else,
    Endif,
    Plain,
    Eof,
    ConsistentDefineKeep,
    ConsistentDefineDrop,
    ContradictoryDefine,
    DifferingDefine,
    ConsistentUndefKeep,
    ConsistentUndefDrop,
    ContradictoryUndef,
}

impl LineType {
    pub(crate) fn table_index(self) -> usize {
        let index = self as usize;
        debug_assert!(index < 10, "categorical line type fed to the table");
        index
    }

    fn to_elif(self) -> Self {
        match self {
            LineType::If => LineType::Elif,
            LineType::True => LineType::ElTrue,
            LineType::False => LineType::ElFalse,
            other => other,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Truth {
    #[default]
    Unresolved,
    False,
    True,
}

/// Result of evaluating a subexpression.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Eval {
    value: i32,
    truth: Truth,
    /// The subexpression is an integer literal.
    konst: bool,
    /// The text of the subexpression cannot be eliminated.
    keep: bool,
    /// Parentheses bracketing exactly this subexpression are
    /// superfluous.
    del_paren: bool,
}

impl Eval {
    fn resolved(&self) -> bool {
        self.truth != Truth::Unresolved
    }

    fn is_true(&self) -> bool {
        self.truth == Truth::True
    }

    fn is_false(&self) -> bool {
        self.truth == Truth::False
    }

    /// A constant that must be retained in the rewritten expression.
    fn keep_const(&self) -> bool {
        self.konst && self.keep
    }

    fn set_value(&mut self, value: i32) {
        self.value = value;
        self.truth = if value != 0 { Truth::True } else { Truth::False };
    }

    fn retain_const(&mut self) {
        self.konst = true;
        self.keep = true;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Binary operators by precedence, loosest first. Operands of the last
/// level are unary expressions.
const PRECEDENCE: &[&[(&[u8], BinOp)]] = &[
    &[(b"||", BinOp::Or)],
    &[(b"&&", BinOp::And)],
    &[(b"|", BinOp::BitOr), (b"^", BinOp::BitXor), (b"&", BinOp::BitAnd)],
    &[(b"==", BinOp::Eq), (b"!=", BinOp::Ne)],
    &[
        (b"<=", BinOp::Le),
        (b">=", BinOp::Ge),
        (b"<", BinOp::Lt),
        (b">", BinOp::Gt),
    ],
    &[(b"<<", BinOp::Shl), (b">>", BinOp::Shr)],
    &[(b"+", BinOp::Add), (b"-", BinOp::Sub)],
    &[(b"*", BinOp::Mul), (b"/", BinOp::Div), (b"%", BinOp::Mod)],
];

/// Match an operator of the given precedence level at `pos`. A
/// one-character operator does not match when doubled, so `&` defers
/// to `&&` and `<` to `<<`.
fn match_op(line: &crate::source::SourceLine, pos: usize, level: usize) -> Option<(BinOp, usize)> {
    for (token, op) in PRECEDENCE[level] {
        let matches = if line.at(pos) != token[0] {
            false
        } else if token.len() == 2 {
            line.at(pos + 1) == token[1]
        } else {
            line.at(pos + 1) != token[0]
        };
        if matches {
            return Some((*op, token.len()));
        }
    }
    None
}

/// Truth-functional `||`, with constant retention. May clear the keep
/// flag on the operand that a true operand makes redundant.
fn op_or(lhs: &mut Eval, rhs: &mut Eval) -> Eval {
    let mut result = Eval::default();
    if lhs.is_true() || rhs.is_true() {
        result.set_value(1);
    } else if lhs.is_false() && rhs.is_false() {
        result.set_value(0);
    }
    if lhs.truth == rhs.truth {
        if lhs.keep_const() || rhs.keep_const() {
            result.retain_const();
        }
    } else if lhs.is_true() {
        if lhs.keep_const() {
            result.retain_const();
        }
        if !rhs.keep_const() {
            rhs.keep = false;
        }
    } else if rhs.is_true() {
        if rhs.keep_const() {
            result.retain_const();
        }
        if !lhs.keep_const() {
            lhs.keep = false;
        }
    } else if lhs.is_false() {
        if rhs.keep_const() {
            result.retain_const();
        }
    } else if rhs.is_false() {
        if lhs.keep_const() {
            result.retain_const();
        }
    }
    result
}

/// Truth-functional `&&`, with constant retention.
fn op_and(lhs: &mut Eval, rhs: &mut Eval) -> Eval {
    let mut result = Eval::default();
    if rhs.is_true() && lhs.is_false() {
        result.set_value(0);
        if lhs.keep_const() {
            result.retain_const();
        }
    } else if lhs.is_true() && rhs.is_false() {
        result.set_value(0);
        if rhs.keep_const() {
            result.retain_const();
        }
    } else if !lhs.resolved() {
        if rhs.is_false() {
            result.set_value(0);
            if rhs.keep_const() {
                result.retain_const();
            }
        } else if lhs.keep_const() {
            result.retain_const();
        }
    } else if !rhs.resolved() {
        if lhs.is_false() {
            result.set_value(0);
            if lhs.keep_const() {
                result.retain_const();
            }
        } else if rhs.keep_const() {
            result.retain_const();
        }
    } else {
        result.set_value(i32::from(lhs.value != 0 && rhs.value != 0));
        if lhs.keep_const() || rhs.keep_const() {
            result.retain_const();
        }
    }
    result
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Numeral {
    pub value: i32,
    /// Bytes consumed, including any sign and suffix.
    pub len: usize,
    /// Value characters consumed, excluding sign and suffix.
    pub digits: usize,
    pub overflow: bool,
}

/// Scan a decimal, octal or hex numeral with optional sign and
/// `u`/`l` suffixes. `0x` with no following hex digit is the numeral
/// `0` followed by an `x`.
pub(crate) fn scan_numeral(text: &[u8]) -> Numeral {
    let mut pos = 0;
    let mut sign = 1i64;
    match text.first() {
        Some(b'-') => {
            sign = -1;
            pos = 1;
        }
        Some(b'+') => {
            pos = 1;
        }
        _ => {}
    }
    let value_start = pos;
    let mut base = 10i64;
    if text.get(pos) == Some(&b'0') {
        pos += 1;
        if matches!(text.get(pos), Some(b'x' | b'X')) {
            pos += 1;
            base = 16;
        } else {
            base = 8;
        }
    }
    let digits_start = pos;
    let mut value = 0i64;
    let mut overflow = false;
    while let Some(&byte) = text.get(pos) {
        let digit = match byte {
            b'0'..=b'9' => i64::from(byte - b'0'),
            b'a'..=b'f' => i64::from(byte - b'a') + 10,
            b'A'..=b'F' => i64::from(byte - b'A') + 10,
            _ => 16,
        };
        if digit >= base {
            break;
        }
        value = value * base + digit;
        if value > i64::from(i32::MAX) {
            overflow = true;
            value = i64::from(i32::MAX);
        }
        pos += 1;
    }
    let mut value_end = pos;
    if base == 16 && value_end == digits_start {
        value_end = value_start + 1;
        pos = value_end;
    } else {
        if matches!(text.get(pos), Some(b'u' | b'U')) {
            pos += 1;
        }
        if matches!(text.get(pos), Some(b'l' | b'L')) {
            pos += 1;
        }
    }
    Numeral {
        value: (sign * value) as i32,
        len: pos,
        digits: value_end - value_start,
        overflow,
    }
}

impl Engine<'_> {
    /// Read and classify one logical line. Returns [`LineType::Eof`]
    /// once the input is exhausted.
    pub(crate) fn eval_line(&mut self) -> Result<LineType, EngineError> {
        if !self.get_line()? {
            self.flush_conflict()?;
            return Ok(LineType::Eof);
        }
        self.edit.simplification = Simplification::empty();
        let mut line_type = LineType::Plain;
        let mut pos = self.chew_on(0)?;
        if self.chew.line_state == LineState::Neuter {
            if self.line.at(pos) == b'#' {
                self.chew.line_state = LineState::Directive;
                pos = self.chew_on(pos + 1)?;
            } else if pos < self.line.len() {
                self.chew.line_state = LineState::Code;
                self.flush_conflict()?;
            }
        }
        if self.chew.comment_state == CommentState::None
            && self.chew.line_state == LineState::Directive
        {
            let keyword_start = pos;
            pos = self.chew_sym(pos)?;
            self.edit.keyword = keyword_start..pos;
            let keyword = self.line.buf[keyword_start..pos].to_vec();
            match keyword.as_slice() {
                b"if" => {
                    let (if_type, npos) = self.eval_if(pos)?;
                    line_type = if_type;
                    pos = npos;
                }
                b"ifdef" | b"ifndef" => {
                    let ifdef = keyword == b"ifdef";
                    pos = self.chew_on(pos)?;
                    let name_start = pos;
                    let (found, end) = self.find_sym(pos)?;
                    pos = end;
                    line_type = LineType::If;
                    if let Some(policy) = self.settings.symbols {
                        self.list_symbol(policy, name_start, end - name_start, found)?;
                    }
                    if let Ok(index) = found {
                        let defined = self.symbols.get(index).def.is_some();
                        line_type = if defined == ifdef {
                            LineType::True
                        } else {
                            LineType::False
                        };
                    }
                }
                b"elif" => {
                    let (if_type, npos) = self.eval_if(pos)?;
                    line_type = if_type.to_elif();
                    pos = npos;
                }
                b"else" => line_type = LineType::Else,
                b"endif" => line_type = LineType::Endif,
                b"error" => {
                    // Suspend lexical analysis for the message text.
                    self.chew.comment_state = CommentState::Pseudo;
                    if self.settings.symbols.is_none() && !self.ifctl.dropping() {
                        self.chew.last_comment_start_line = self.line.line_num;
                        if self.ifctl.is_unconditional() {
                            self.status |= StatusFlags::ERROR_OUTPUT;
                            if self.ifctl.was_unconditional() {
                                self.warn_here("An unconditional #error directive was input");
                            } else {
                                self.warn_here("An unconditional #error directive was output");
                            }
                        }
                    }
                }
                b"define" => {
                    if self.settings.symbols.is_none() && !self.ifctl.dropping() {
                        let (define_type, npos) = self.eval_define(pos)?;
                        line_type = define_type;
                        pos = npos;
                    }
                }
                b"undef" => {
                    if self.settings.symbols.is_none() && !self.ifctl.dropping() {
                        let (undef_type, npos) = self.eval_undef(pos)?;
                        line_type = undef_type;
                        pos = npos;
                    }
                }
                _ => {
                    self.chew.line_state = LineState::Code;
                    line_type = LineType::Plain;
                }
            }
            pos = self.chew_on(pos)?;
            if pos < self.line.len() {
                self.chew.line_state = LineState::Code;
                if line_type != LineType::Plain {
                    if self.line.at(pos) == b')' {
                        return Err(self.parse_error(format!(
                            "Missing \"(\" in \"{}\"",
                            self.line.display()
                        )));
                    }
                    self.warn_here(format!(
                        "Garbage following preprocessor directive in \"{}\"",
                        self.line.display()
                    ));
                }
            }
            if line_type != LineType::ContradictoryUndef {
                self.flush_conflict()?;
            }
        }
        if self.chew.line_state == LineState::Code {
            while pos < self.line.len() {
                pos = self.chew_on(pos + 1)?;
            }
        }
        Ok(line_type)
    }

    /// Evaluate an `#if`/`#elif` condition, producing `True`/`False`
    /// when it resolves and `If` otherwise.
    fn eval_if(&mut self, pos: usize) -> Result<(LineType, usize), EngineError> {
        let (result, pos) = self.eval_expr(0, pos)?;
        let line_type = if result.keep_const() {
            LineType::If
        } else if result.is_true() {
            LineType::True
        } else if result.is_false() {
            LineType::False
        } else {
            LineType::If
        };
        Ok((line_type, pos))
    }

    /// Classify a `#define` against the assumptions.
    fn eval_define(&mut self, pos: usize) -> Result<(LineType, usize), EngineError> {
        let mut pos = self.chew_on(pos)?;
        let (found, end) = self.find_sym(pos)?;
        pos = end;
        let mut functionoid = false;
        let line_type = 'classify: {
            let Ok(index) = found else {
                // Not assumed either way.
                break 'classify LineType::ConsistentDefineKeep;
            };
            let Some(def) = self.symbols.get(index).def.clone() else {
                break 'classify LineType::ContradictoryDefine;
            };
            if self.line.at(pos) == b'(' {
                functionoid = true;
                break 'classify LineType::DifferingDefine;
            }
            pos = self.chew_on(pos)?;
            if pos < self.line.len() {
                // #define sym str1 [str2...]
                let token_end = self.chew_str(pos)?;
                if self.line.buf[pos..token_end] != *def.as_bytes() {
                    pos = token_end;
                    break 'classify LineType::DifferingDefine;
                }
                pos = self.chew_on(token_end)?;
                let trailing = self.chew_sym(pos)?;
                if trailing == pos {
                    break 'classify LineType::ConsistentDefineDrop;
                }
                pos = trailing;
                break 'classify LineType::DifferingDefine;
            }
            // #define sym
            if def.is_empty() {
                if self.conflict.as_ref().map(|pending| pending.sym) == Some(index) {
                    // The precautionary #undef/#define pair.
                    self.forget_conflict();
                }
                break 'classify LineType::ConsistentDefineDrop;
            }
            break 'classify LineType::DifferingDefine;
        };
        if functionoid {
            // Normal lexical rules apply up to the closing parenthesis
            // of the parameter list.
            loop {
                pos = self.chew_on(pos)?;
                if pos >= self.line.len() || self.line.at(pos) == b')' {
                    break;
                }
                pos += 1;
            }
        }
        if pos < self.line.len() {
            // Skip the replacement text without lexical analysis.
            self.chew.comment_state = CommentState::Pseudo;
            self.chew.last_comment_start_line = self.line.line_num;
            loop {
                pos = self.chew_on(pos)?;
                if pos >= self.line.len() {
                    break;
                }
                pos += 1;
            }
        }
        Ok((line_type, pos))
    }

    /// Classify an `#undef` against the assumptions. A contradictory
    /// `#undef` saves a deferred diagnosis keyed to the symbol.
    fn eval_undef(&mut self, pos: usize) -> Result<(LineType, usize), EngineError> {
        let mut pos = self.chew_on(pos)?;
        let (found, end) = self.find_sym(pos)?;
        pos = end;
        let line_type = match found {
            Err(_) => LineType::ConsistentUndefKeep,
            Ok(index) => match self.symbols.get(index).def {
                None => LineType::ConsistentUndefDrop,
                Some(_) => {
                    if self.conflict.as_ref().map(|pending| pending.sym) != Some(index) {
                        self.flush_conflict()?;
                        self.save_conflict(index);
                    }
                    LineType::ContradictoryUndef
                }
            },
        };
        pos = self.chew_on(pos)?;
        Ok((line_type, pos))
    }

    /// Locate the identifier at `pos` in the symbol table. Returns the
    /// lookup result and the position just past the identifier.
    fn find_sym(&mut self, pos: usize) -> Result<(Result<usize, usize>, usize), EngineError> {
        let end = self.chew_sym(pos)?;
        if end == pos {
            return Err(self.parse_error(format!(
                "Identifier needed instead of \"{}\"",
                self.line.display()
            )));
        }
        let found = self.symbols.find(&self.line.buf[pos..end]);
        Ok((found, end))
    }

    /// Report a symbol occurring in a conditional, under `--symbols`.
    fn list_symbol(
        &mut self,
        policy: SymbolsPolicy,
        name_start: usize,
        name_len: usize,
        found: Result<usize, usize>,
    ) -> Result<(), EngineError> {
        let name =
            String::from_utf8_lossy(&self.line.buf[name_start..name_start + name_len]).into_owned();
        let visited = match found {
            Err(insert_at) => {
                self.symbols.insert_unknown(insert_at, name.as_bytes());
                self.symbols.get_mut(insert_at).visited = true;
                false
            }
            Ok(index) => {
                let visited = self.symbols.get(index).visited;
                self.symbols.get_mut(index).visited = true;
                visited
            }
        };
        if visited && policy.first_only() {
            return Ok(());
        }
        let mut text = name;
        if policy.locate() {
            text.push_str(&format!(": {}({})", self.source.name, self.line.line_num));
        }
        text.push('\n');
        crate::despatch::write_out(&mut *self.out, &self.source.name, text.as_bytes())
    }

    /// Resolve a symbol from its replacement text: as a numeral if
    /// possible, else by recursive evaluation. The visited mark breaks
    /// circular definitions.
    fn eval_symbol(&mut self, index: usize) -> Result<(), EngineError> {
        self.symbols.get_mut(index).visited = true;
        let Some(def) = self.symbols.get(index).def.clone() else {
            // Assumed undefined: evaluates false.
            self.symbols.get_mut(index).resolution = Resolution::Value(0);
            return Ok(());
        };
        let bytes = def.as_bytes();
        let numeral = scan_numeral(bytes);
        if numeral.overflow {
            self.warn_here(format!(
                "Integer constant \"{def}\" is too big for ifprune (max {}): \
                 expression will not be resolved",
                i32::MAX
            ));
            return Ok(());
        }
        if numeral.digits > 0 && numeral.len == bytes.len() {
            self.symbols.get_mut(index).resolution = Resolution::Value(numeral.value);
            return Ok(());
        }
        if bytes.is_empty() {
            return Ok(());
        }
        // Evaluate the replacement text as an expression, borrowing the
        // line buffer. Any marks made against the borrowed text are
        // discarded with it.
        let saved_buf = std::mem::replace(&mut self.line.buf, def.into_bytes());
        let saved_simplification = self.edit.simplification;
        let was_parsing = self.parsing_sym_def;
        self.parsing_sym_def = true;
        let outcome = self.eval_expr(0, 0);
        self.parsing_sym_def = was_parsing;
        self.line.buf = saved_buf;
        self.edit.simplification = saved_simplification;
        let (result, _) = outcome?;
        self.symbols.get_mut(index).resolution = if result.resolved() {
            Resolution::Value(result.value)
        } else {
            Resolution::Insoluble
        };
        Ok(())
    }

    /// Skip the right operand of a short-circuited `&&`: to the end of
    /// the directive, an unbalanced `)`, or a `||` at this level.
    fn short_circuit_and(&mut self, mut pos: usize) -> Result<usize, EngineError> {
        let mut balance = 0i32;
        loop {
            pos = self.chew_on(pos)?;
            if pos >= self.line.len() {
                break;
            }
            match self.line.at(pos) {
                b'(' => balance += 1,
                b')' => balance -= 1,
                _ => {}
            }
            if balance < 0 {
                break;
            }
            if balance == 0 && self.line.at(pos) == b'|' && self.line.at(pos + 1) == b'|' {
                break;
            }
            pos += 1;
        }
        Ok(pos)
    }

    /// Skip the right operand of a short-circuited `||`: to the end of
    /// the directive or an unbalanced `)`.
    fn short_circuit_or(&mut self, mut pos: usize) -> Result<usize, EngineError> {
        let mut balance = 0i32;
        loop {
            pos = self.chew_on(pos)?;
            if pos >= self.line.len() {
                break;
            }
            match self.line.at(pos) {
                b'(' => balance += 1,
                b')' => balance -= 1,
                _ => {}
            }
            if balance < 0 {
                break;
            }
            pos += 1;
        }
        Ok(pos)
    }

    fn eval_operand(&mut self, level: usize, pos: usize) -> Result<(Eval, usize), EngineError> {
        if level + 1 < PRECEDENCE.len() {
            self.eval_expr(level + 1, pos)
        } else {
            self.eval_unary(pos)
        }
    }

    fn apply_bin_op(&mut self, op: BinOp, lhs: &mut Eval, rhs: &mut Eval) -> Eval {
        match op {
            BinOp::Or => return op_or(lhs, rhs),
            BinOp::And => return op_and(lhs, rhs),
            _ => {}
        }
        let mut result = Eval::default();
        if !(lhs.konst || lhs.resolved()) || !(rhs.konst || rhs.resolved()) {
            return result;
        }
        let (left, right) = (lhs.value, rhs.value);
        let value = match op {
            BinOp::BitOr => left | right,
            BinOp::BitXor => left ^ right,
            BinOp::BitAnd => left & right,
            BinOp::Eq => i32::from(left == right),
            BinOp::Ne => i32::from(left != right),
            BinOp::Le => i32::from(left <= right),
            BinOp::Ge => i32::from(left >= right),
            BinOp::Lt => i32::from(left < right),
            BinOp::Gt => i32::from(left > right),
            BinOp::Shl => left.wrapping_shl(right as u32),
            BinOp::Shr => left.wrapping_shr(right as u32),
            BinOp::Add => left.wrapping_add(right),
            BinOp::Sub => left.wrapping_sub(right),
            BinOp::Mul => left.wrapping_mul(right),
            BinOp::Div | BinOp::Mod => {
                if right == 0 {
                    self.warn_here("Divide by zero");
                    return result;
                }
                if op == BinOp::Div {
                    left.wrapping_div(right)
                } else {
                    left.wrapping_rem(right)
                }
            }
            BinOp::Or | BinOp::And => unreachable!(),
        };
        result.set_value(value);
        result
    }

    /// Evaluate binary expressions at one precedence level, left to
    /// right, simplifying `&&`/`||` subexpressions whose truth value a
    /// resolved operand decides. Cut text is marked in the line buffer
    /// as it is discovered.
    fn eval_expr(&mut self, level: usize, pos: usize) -> Result<(Eval, usize), EngineError> {
        let mut start_cut = pos;
        let (mut lhs, mut pos) = self.eval_operand(level, pos)?;
        let mut result = lhs;
        result.del_paren = true;
        loop {
            pos = self.chew_on(pos)?;
            if pos >= self.line.len() || self.line.at(pos) == b')' {
                break;
            }
            let Some((op, token_len)) = match_op(&self.line, pos, level) else {
                break;
            };
            let start_lhs_cut = start_cut;
            let op_start = pos;
            pos += token_len;
            let op_end = pos;
            result.del_paren = false;
            if lhs.resolved() && !lhs.keep_const() {
                if lhs.is_true() && op == BinOp::Or {
                    pos = self.short_circuit_or(pos)?;
                    break;
                } else if lhs.is_false() && op == BinOp::And {
                    pos = self.short_circuit_and(pos)?;
                    break;
                } else if (lhs.is_true() && op == BinOp::And)
                    || (lhs.is_false() && op == BinOp::Or)
                {
                    // TRUE && R reduces to R, as does FALSE || R: the
                    // left operand and the operator go.
                    self.cut_text(start_lhs_cut, op_end);
                    result.del_paren = true;
                }
            }
            start_cut = op_start;
            let (mut rhs, after_rhs) = self.eval_operand(level, pos)?;
            pos = after_rhs;
            let mut combined = self.apply_bin_op(op, &mut lhs, &mut rhs);
            if matches!(op, BinOp::Or | BinOp::And) {
                if !lhs.keep && rhs.keep {
                    self.cut_text(start_lhs_cut, op_end);
                    combined.del_paren = true;
                    combined.keep = true;
                } else if !rhs.keep && lhs.keep {
                    self.cut_text(start_cut, pos);
                    combined.del_paren = true;
                    combined.keep = true;
                }
            }
            result = combined;
            if !result.resolved() {
                result.keep = true;
            }
            lhs = result;
        }
        if !result.resolved() {
            result.keep = true;
        }
        Ok((result, pos))
    }

    /// Evaluate a unary expression: `!`, `~`, unary `+`/`-`, a
    /// parenthesised expression, an integer literal, `defined`, or an
    /// identifier.
    fn eval_unary(&mut self, pos: usize) -> Result<(Eval, usize), EngineError> {
        let mut result = Eval::default();
        let mut pos = self.chew_on(pos)?;
        let byte = self.line.at(pos);
        if byte == b'!' {
            let (inner, after) = self.eval_unary(pos + 1)?;
            pos = after;
            result = inner;
            if result.resolved() {
                result.value = i32::from(result.value == 0);
                result.truth = match result.truth {
                    Truth::True => Truth::False,
                    Truth::False => Truth::True,
                    Truth::Unresolved => Truth::Unresolved,
                };
            }
        } else if byte == b'~' {
            let (inner, after) = self.eval_unary(pos + 1)?;
            pos = after;
            if inner.resolved() {
                result.set_value(!inner.value);
            }
        } else if byte == b'(' {
            let start = pos;
            let (inner, after) = self.eval_expr(0, pos + 1)?;
            pos = self.chew_on(after)?;
            if self.line.at(pos) != b')' {
                return Err(self.parse_error(format!(
                    "Missing \")\" in \"{}\"",
                    self.line.display()
                )));
            }
            if inner.del_paren {
                self.delete_paren(start, pos);
            }
            result = inner;
            pos += 1;
        } else if byte == b'+' {
            let (inner, after) = self.eval_unary(pos + 1)?;
            pos = after;
            result = inner;
        } else if byte == b'-' {
            let (inner, after) = self.eval_unary(pos + 1)?;
            pos = after;
            result = inner;
            if result.resolved() {
                result.value = result.value.wrapping_neg();
            }
        } else if byte.is_ascii_digit() {
            let numeral = scan_numeral(&self.line.buf[pos..]);
            if numeral.overflow {
                let literal =
                    String::from_utf8_lossy(&self.line.buf[pos..pos + numeral.len]).into_owned();
                self.warn_here(format!(
                    "Integer constant \"{literal}\" is too big for ifprune (max {}): \
                     expression will not be resolved",
                    i32::MAX
                ));
            } else {
                result.value = numeral.value;
                if self.parsing_sym_def {
                    result.truth = if numeral.value != 0 {
                        Truth::True
                    } else {
                        Truth::False
                    };
                } else {
                    result.konst = true;
                    if !self.settings.del_consts {
                        result.keep = true;
                    }
                    if self.settings.eval_consts {
                        result.truth = if numeral.value != 0 {
                            Truth::True
                        } else {
                            Truth::False
                        };
                    }
                }
            }
            pos += numeral.len;
        } else if self.line.starts_with_at(pos, b"defined") && !symchar(self.line.at(pos + 7)) {
            pos = self.chew_on(pos + 7)?;
            let paren = self.line.at(pos) == b'(';
            if paren {
                pos += 1;
            }
            let name_start = self.chew_on(pos)?;
            let (found, end) = self.find_sym(name_start)?;
            let name_len = end - name_start;
            pos = self.chew_on(end)?;
            if paren {
                if self.line.at(pos) == b')' {
                    pos += 1;
                } else {
                    return Err(self.parse_error(format!(
                        "Missing \")\" in \"{}\"",
                        self.line.display()
                    )));
                }
            }
            if let Some(policy) = self.settings.symbols {
                self.list_symbol(policy, name_start, name_len, found)?;
            } else if let Ok(index) = found {
                result.set_value(i32::from(self.symbols.get(index).def.is_some()));
            }
            // An unknown symbol leaves the result unresolved.
        } else if symchar(byte) {
            let name_start = pos;
            let (found, end) = self.find_sym(pos)?;
            pos = end;
            if let Some(policy) = self.settings.symbols {
                self.list_symbol(policy, name_start, end - name_start, found)?;
            } else if let Ok(index) = found {
                if self.symbols.get(index).resolution != Resolution::Insoluble {
                    if self.symbols.get(index).resolution == Resolution::Unevaluated {
                        if !self.symbols.get(index).visited {
                            self.eval_symbol(index)?;
                        } else {
                            // Revisited while unresolved: circular.
                            self.symbols.get_mut(index).resolution = Resolution::Insoluble;
                        }
                    }
                    if matches!(self.symbols.get(index).def.as_deref(), Some("")) {
                        let name = self.symbols.get(index).name.clone();
                        self.warn_here(format!("Empty symbol \"{name}\" in expression"));
                    }
                    if let Resolution::Value(value) = self.symbols.get(index).resolution {
                        result.set_value(value);
                    }
                }
            }
        }
        if !result.resolved() {
            result.keep = true;
        }
        Ok((result, pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(b"0", 0, 1; "zero")]
    #[test_case(b"42", 42, 2; "decimal")]
    #[test_case(b"010", 8, 3; "octal")]
    #[test_case(b"0x1F", 31, 4; "hex")]
    #[test_case(b"0X1f", 31, 4; "hex upper")]
    #[test_case(b"-5", -5, 2; "negative")]
    #[test_case(b"+7", 7, 2; "positive")]
    #[test_case(b"42u", 42, 3; "unsigned suffix")]
    #[test_case(b"42UL", 42, 4; "unsigned long suffix")]
    #[test_case(b"42l", 42, 3; "long suffix")]
    fn numerals(text: &[u8], value: i32, len: usize) {
        let numeral = scan_numeral(text);
        assert_eq!(numeral.value, value);
        assert_eq!(numeral.len, len);
        assert!(!numeral.overflow);
        assert!(numeral.digits > 0);
    }

    #[test]
    fn numeral_stops_at_garbage() {
        let numeral = scan_numeral(b"12+3");
        assert_eq!(numeral.value, 12);
        assert_eq!(numeral.len, 2);
    }

    #[test]
    fn bare_hex_prefix_is_zero() {
        let numeral = scan_numeral(b"0x");
        assert_eq!(numeral.value, 0);
        assert_eq!(numeral.len, 1);
    }

    #[test]
    fn max_value_is_not_overflow() {
        let numeral = scan_numeral(b"2147483647");
        assert_eq!(numeral.value, i32::MAX);
        assert!(!numeral.overflow);
    }

    #[test]
    fn overflow_is_flagged() {
        assert!(scan_numeral(b"2147483648").overflow);
        assert!(scan_numeral(b"0xFFFFFFFF").overflow);
    }

    #[test]
    fn empty_text_scans_nothing() {
        let numeral = scan_numeral(b"");
        assert_eq!(numeral.len, 0);
        assert_eq!(numeral.digits, 0);
    }

    #[test]
    fn doubled_single_char_operators_do_not_match() {
        use crate::source::SourceLine;
        let mut line = SourceLine::default();
        line.buf = b"&& | << <".to_vec();
        // `&` must not match the first byte of `&&`.
        assert_eq!(match_op(&line, 0, 2), None);
        assert_eq!(match_op(&line, 0, 1), Some((BinOp::And, 2)));
        assert_eq!(match_op(&line, 3, 2), Some((BinOp::BitOr, 1)));
        // `<` must not match the first byte of `<<`.
        assert_eq!(match_op(&line, 5, 4), None);
        assert_eq!(match_op(&line, 5, 5), Some((BinOp::Shl, 2)));
        assert_eq!(match_op(&line, 8, 4), Some((BinOp::Lt, 1)));
    }
}
