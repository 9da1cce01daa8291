//! Inline LaTeX to MathML conversion
//!
//! Titles and abstracts carry inline math as `$...$` (and occasionally
//! `$$...$$`). [`InlineMathRenderer`] converts each segment into a
//! `<math>` element. Conversion is best-effort: a segment that uses an
//! unsupported command or has unbalanced braces is left exactly as written,
//! delimiters included.

const MATHML_NS: &str = "http://www.w3.org/1998/Math/MathML";

/// Converts free text containing inline math into display markup
pub trait MathRenderer: Send + Sync {
    /// Render `text`, leaving anything that cannot be converted unchanged
    fn render(&self, text: &str) -> String;
}

/// Renderer that returns text untouched
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainText;

impl MathRenderer for PlainText {
    fn render(&self, text: &str) -> String {
        text.to_string()
    }
}

/// `$...$` to MathML renderer
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineMathRenderer;

impl InlineMathRenderer {
    /// Create a renderer
    pub fn new() -> Self {
        Self
    }
}

impl MathRenderer for InlineMathRenderer {
    fn render(&self, text: &str) -> String {
        let chars: Vec<char> = text.chars().collect();
        let mut out = String::with_capacity(text.len());
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            if c == '\\' && chars.get(i + 1) == Some(&'$') {
                out.push_str("\\$");
                i += 2;
                continue;
            }
            if c != '$' {
                out.push(c);
                i += 1;
                continue;
            }

            let display = chars.get(i + 1) == Some(&'$');
            let open = if display { 2 } else { 1 };
            let Some(close) = find_closing(&chars, i + open, display) else {
                // Unterminated: keep the remainder verbatim
                out.extend(&chars[i..]);
                break;
            };

            let source: String = chars[i + open..close].iter().collect();
            let end = close + open;
            match latex_to_mathml(&source, display) {
                Some(markup) => out.push_str(&markup),
                None => {
                    tracing::debug!(segment = %source, "Leaving unsupported math segment as-is");
                    out.extend(&chars[i..end]);
                }
            }
            i = end;
        }

        out
    }
}

fn find_closing(chars: &[char], from: usize, display: bool) -> Option<usize> {
    let mut j = from;
    while j < chars.len() {
        match chars[j] {
            '\\' => j += 2,
            '$' if !display => return Some(j),
            '$' if chars.get(j + 1) == Some(&'$') => return Some(j),
            '$' => return None,
            _ => j += 1,
        }
    }
    None
}

/// Convert one LaTeX math segment (without delimiters) into a `<math>` element
///
/// Returns `None` when the segment uses something this converter does not know.
pub fn latex_to_mathml(source: &str, display: bool) -> Option<String> {
    if source.trim().is_empty() {
        return None;
    }
    let mut parser = Parser {
        chars: source.chars().collect(),
        pos: 0,
    };
    let body = parser.row(false)?;
    if parser.pos < parser.chars.len() {
        return None;
    }

    let display_attr = if display { " display=\"block\"" } else { "" };
    Some(format!("<math xmlns=\"{MATHML_NS}\"{display_attr}>{body}</math>"))
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    /// Sequence of scripted atoms, up to `}` when `in_group`
    fn row(&mut self, in_group: bool) -> Option<String> {
        let mut out = String::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None if in_group => return None,
                None => return Some(out),
                Some('}') if in_group => {
                    self.pos += 1;
                    return Some(out);
                }
                Some('}') => return None,
                Some(_) => out.push_str(&self.scripted()?),
            }
        }
    }

    fn scripted(&mut self) -> Option<String> {
        let base = self.atom()?;
        let mut sub = None;
        let mut sup = None;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('_') if sub.is_none() => {
                    self.pos += 1;
                    sub = Some(self.atom()?);
                }
                Some('^') if sup.is_none() => {
                    self.pos += 1;
                    sup = Some(self.atom()?);
                }
                Some('\'') if sup.is_none() => {
                    let mut primes = String::new();
                    while self.peek() == Some('\'') {
                        self.pos += 1;
                        primes.push('′');
                    }
                    sup = Some(format!("<mo>{primes}</mo>"));
                }
                _ => break,
            }
        }

        Some(match (sub, sup) {
            (None, None) => base,
            (Some(sub), None) => format!("<msub>{base}{sub}</msub>"),
            (None, Some(sup)) => format!("<msup>{base}{sup}</msup>"),
            (Some(sub), Some(sup)) => format!("<msubsup>{base}{sub}{sup}</msubsup>"),
        })
    }

    fn atom(&mut self) -> Option<String> {
        self.skip_whitespace();
        let c = self.peek()?;
        match c {
            '{' => {
                self.pos += 1;
                let inner = self.row(true)?;
                Some(format!("<mrow>{inner}</mrow>"))
            }
            '\\' => {
                self.pos += 1;
                self.command()
            }
            '0'..='9' => Some(self.number()),
            c if c.is_alphabetic() => {
                self.pos += 1;
                Some(format!("<mi>{c}</mi>"))
            }
            '}' | '^' | '_' | '$' | '&' | '#' | '%' | '~' => None,
            '-' => {
                self.pos += 1;
                Some("<mo>−</mo>".to_string())
            }
            c if is_operator(c) => {
                self.pos += 1;
                Some(format!("<mo>{}</mo>", escape(&c.to_string())))
            }
            _ => None,
        }
    }

    fn number(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            let decimal_point = c == '.'
                && self
                    .chars
                    .get(self.pos + 1)
                    .is_some_and(|next| next.is_ascii_digit());
            if c.is_ascii_digit() || decimal_point {
                self.pos += 1;
            } else {
                break;
            }
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        format!("<mn>{digits}</mn>")
    }

    fn command_name(&mut self) -> Option<String> {
        let c = self.peek()?;
        if !c.is_ascii_alphabetic() {
            self.pos += 1;
            return Some(c.to_string());
        }
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        Some(self.chars[start..self.pos].iter().collect())
    }

    /// Raw text of a `{...}` group, for `\text` and friends
    fn raw_group(&mut self) -> Option<String> {
        self.skip_whitespace();
        if self.peek() != Some('{') {
            return None;
        }
        self.pos += 1;
        let start = self.pos;
        let mut depth = 1usize;
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(self.chars[start..self.pos - 1].iter().collect());
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn command(&mut self) -> Option<String> {
        let name = self.command_name()?;
        match name.as_str() {
            "frac" | "dfrac" | "tfrac" => {
                let num = self.atom()?;
                let den = self.atom()?;
                Some(format!("<mfrac>{num}{den}</mfrac>"))
            }
            "sqrt" => {
                self.skip_whitespace();
                if self.peek() == Some('[') {
                    self.pos += 1;
                    let start = self.pos;
                    while self.peek().is_some_and(|c| c != ']') {
                        self.pos += 1;
                    }
                    self.peek()?;
                    let index_src: String = self.chars[start..self.pos].iter().collect();
                    self.pos += 1;
                    let index = latex_row(&index_src)?;
                    let radicand = self.atom()?;
                    Some(format!("<mroot>{radicand}<mrow>{index}</mrow></mroot>"))
                } else {
                    let radicand = self.atom()?;
                    Some(format!("<msqrt>{radicand}</msqrt>"))
                }
            }
            "text" | "textrm" | "mathrm" | "textit" | "operatorname" => {
                let raw = self.raw_group()?;
                if raw.contains('\\') || raw.contains('{') {
                    return None;
                }
                let tag = if name == "operatorname" { "mi" } else { "mtext" };
                Some(format!("<{tag}>{}</{tag}>", escape(&raw)))
            }
            "mathbf" | "mathbb" | "mathcal" | "mathit" | "mathsf" | "mathfrak" | "boldsymbol" => {
                let raw = self.raw_group()?;
                let raw = raw.trim();
                if raw.is_empty() || !raw.chars().all(char::is_alphanumeric) {
                    return None;
                }
                let variant = match name.as_str() {
                    "mathbf" | "boldsymbol" => "bold",
                    "mathbb" => "double-struck",
                    "mathcal" => "script",
                    "mathit" => "italic",
                    "mathsf" => "sans-serif",
                    _ => "fraktur",
                };
                Some(format!("<mi mathvariant=\"{variant}\">{raw}</mi>"))
            }
            "left" | "right" | "big" | "Big" | "bigg" | "Bigg" | "bigl" | "bigr" => {
                self.skip_whitespace();
                match self.peek()? {
                    '.' => {
                        self.pos += 1;
                        Some(String::new())
                    }
                    '\\' => {
                        self.pos += 1;
                        self.command()
                    }
                    c if is_operator(c) => {
                        self.pos += 1;
                        Some(format!("<mo>{}</mo>", escape(&c.to_string())))
                    }
                    _ => None,
                }
            }
            "," | ";" | ":" | " " | "quad" | "qquad" => Some("<mspace width=\"0.2em\"/>".to_string()),
            "!" => Some(String::new()),
            "{" | "}" | "|" | "%" | "$" | "&" | "#" | "_" => {
                let symbol = if name == "|" { "‖" } else { name.as_str() };
                Some(format!("<mo>{}</mo>", escape(symbol)))
            }
            other => {
                if let Some(letter) = greek(other) {
                    Some(format!("<mi>{letter}</mi>"))
                } else if let Some(symbol) = operator_symbol(other) {
                    Some(format!("<mo>{symbol}</mo>"))
                } else if let Some(symbol) = identifier_symbol(other) {
                    Some(format!("<mi>{symbol}</mi>"))
                } else if is_function_name(other) {
                    Some(format!("<mi>{other}</mi>"))
                } else {
                    None
                }
            }
        }
    }
}

fn latex_row(source: &str) -> Option<String> {
    let mut parser = Parser {
        chars: source.chars().collect(),
        pos: 0,
    };
    let row = parser.row(false)?;
    (parser.pos == parser.chars.len()).then_some(row)
}

fn is_operator(c: char) -> bool {
    matches!(
        c,
        '+' | '=' | '<' | '>' | '(' | ')' | '[' | ']' | '|' | ',' | '.' | ';' | ':' | '!' | '/'
            | '*' | '?'
    )
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn greek(name: &str) -> Option<char> {
    Some(match name {
        "alpha" => 'α',
        "beta" => 'β',
        "gamma" => 'γ',
        "delta" => 'δ',
        "epsilon" => 'ϵ',
        "varepsilon" => 'ε',
        "zeta" => 'ζ',
        "eta" => 'η',
        "theta" => 'θ',
        "vartheta" => 'ϑ',
        "iota" => 'ι',
        "kappa" => 'κ',
        "lambda" => 'λ',
        "mu" => 'μ',
        "nu" => 'ν',
        "xi" => 'ξ',
        "pi" => 'π',
        "varpi" => 'ϖ',
        "rho" => 'ρ',
        "varrho" => 'ϱ',
        "sigma" => 'σ',
        "varsigma" => 'ς',
        "tau" => 'τ',
        "upsilon" => 'υ',
        "phi" => 'ϕ',
        "varphi" => 'φ',
        "chi" => 'χ',
        "psi" => 'ψ',
        "omega" => 'ω',
        "Gamma" => 'Γ',
        "Delta" => 'Δ',
        "Theta" => 'Θ',
        "Lambda" => 'Λ',
        "Xi" => 'Ξ',
        "Pi" => 'Π',
        "Sigma" => 'Σ',
        "Upsilon" => 'Υ',
        "Phi" => 'Φ',
        "Psi" => 'Ψ',
        "Omega" => 'Ω',
        _ => return None,
    })
}

fn operator_symbol(name: &str) -> Option<&'static str> {
    Some(match name {
        "times" => "×",
        "cdot" => "⋅",
        "div" => "÷",
        "pm" => "±",
        "mp" => "∓",
        "leq" | "le" => "≤",
        "geq" | "ge" => "≥",
        "neq" | "ne" => "≠",
        "ll" => "≪",
        "gg" => "≫",
        "approx" => "≈",
        "sim" => "∼",
        "simeq" => "≃",
        "cong" => "≅",
        "equiv" => "≡",
        "propto" => "∝",
        "sum" => "∑",
        "prod" => "∏",
        "int" => "∫",
        "oint" => "∮",
        "to" | "rightarrow" => "→",
        "leftarrow" | "gets" => "←",
        "Rightarrow" | "implies" => "⇒",
        "Leftarrow" => "⇐",
        "leftrightarrow" => "↔",
        "Leftrightarrow" | "iff" => "⇔",
        "mapsto" => "↦",
        "in" => "∈",
        "notin" => "∉",
        "ni" => "∋",
        "subset" => "⊂",
        "subseteq" => "⊆",
        "supset" => "⊃",
        "supseteq" => "⊇",
        "cup" => "∪",
        "cap" => "∩",
        "setminus" => "∖",
        "forall" => "∀",
        "exists" => "∃",
        "neg" | "lnot" => "¬",
        "land" | "wedge" => "∧",
        "lor" | "vee" => "∨",
        "oplus" => "⊕",
        "otimes" => "⊗",
        "circ" => "∘",
        "ast" => "∗",
        "star" => "⋆",
        "mid" => "∣",
        "parallel" => "∥",
        "perp" => "⊥",
        "langle" => "⟨",
        "rangle" => "⟩",
        "lfloor" => "⌊",
        "rfloor" => "⌋",
        "lceil" => "⌈",
        "rceil" => "⌉",
        "ldots" | "dots" => "…",
        "cdots" => "⋯",
        "vert" => "|",
        "Vert" => "‖",
        _ => return None,
    })
}

fn identifier_symbol(name: &str) -> Option<&'static str> {
    Some(match name {
        "infty" => "∞",
        "partial" => "∂",
        "nabla" => "∇",
        "ell" => "ℓ",
        "hbar" => "ℏ",
        "emptyset" | "varnothing" => "∅",
        "aleph" => "ℵ",
        _ => return None,
    })
}

fn is_function_name(name: &str) -> bool {
    matches!(
        name,
        "log" | "ln" | "exp" | "sin" | "cos" | "tan" | "sinh" | "cosh" | "tanh" | "arcsin"
            | "arccos" | "arctan" | "max" | "min" | "sup" | "inf" | "lim" | "limsup" | "liminf"
            | "det" | "dim" | "ker" | "deg" | "gcd" | "arg" | "Pr"
    )
}
