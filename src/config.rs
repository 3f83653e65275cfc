use thiserror::Error;

// Delimiters that terminate a bare word. A '#' only opens a comment at the
// start of a token, so it is deliberately absent here.
const DELIMITERS: &[u8] = b" \t\r\n;{}";

/// Token classes produced by the lexer. `Comment` tokens are recognized and
/// discarded before the parser sees them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Start,
    Normal,
    Quoted,
    StartBlock,
    EndBlock,
    StatementEnd,
    Comment,
    Eof,
    Error,
}

impl TokenKind {
    fn as_str(self) -> &'static str {
        match self {
            TokenKind::Start => "start",
            TokenKind::Normal => "word",
            TokenKind::Quoted => "quoted string",
            TokenKind::StartBlock => "'{'",
            TokenKind::EndBlock => "'}'",
            TokenKind::StatementEnd => "';'",
            TokenKind::Comment => "comment",
            TokenKind::Eof => "end of input",
            TokenKind::Error => "invalid token",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config: {0} may not follow {1}")]
    BadTransition(&'static str, &'static str),
    #[error("config: unterminated quoted string")]
    UnterminatedQuote,
    #[error("config: closing quote must be followed by a delimiter")]
    QuoteNotDelimited,
    #[error("config: unexpected '}}' with no open block")]
    UnbalancedClose,
    #[error("config: unclosed block at end of input")]
    UnclosedBlock,
    #[error("config: missing or invalid port directive")]
    InvalidPort,
    #[error("config: {0}")]
    Route(String),
    #[error("config: cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// One parsed directive: its tokens in source order plus an optional child
/// block. Quoted tokens keep their surrounding quote characters verbatim.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Statement {
    pub tokens: Vec<String>,
    pub block: Option<Block>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Block {
    pub statements: Vec<Statement>,
}

impl Block {
    /// Canonical form: two-space indent per depth, one statement per line.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        self.serialize_into(&mut out, 0);
        out
    }

    fn serialize_into(&self, out: &mut String, depth: usize) {
        for stmt in &self.statements {
            for _ in 0..depth {
                out.push_str("  ");
            }
            out.push_str(&stmt.tokens.join(" "));
            match &stmt.block {
                Some(block) => {
                    out.push_str(" {\n");
                    block.serialize_into(out, depth + 1);
                    for _ in 0..depth {
                        out.push_str("  ");
                    }
                    out.push_str("}\n");
                }
                None => out.push_str(";\n"),
            }
        }
    }
}

struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.input.len() {
            match self.input[self.pos] {
                b' ' | b'\t' | b'\r' | b'\n' => self.pos += 1,
                _ => break,
            }
        }
    }

    // Scans one token. Whitespace and comments never reach the caller.
    fn next_token(&mut self) -> Result<(TokenKind, String), ConfigError> {
        loop {
            self.skip_whitespace();
            if self.pos >= self.input.len() {
                return Ok((TokenKind::Eof, String::new()));
            }
            match self.input[self.pos] {
                b'#' => {
                    while self.pos < self.input.len() && self.input[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                }
                b';' => {
                    self.pos += 1;
                    return Ok((TokenKind::StatementEnd, ";".to_string()));
                }
                b'{' => {
                    self.pos += 1;
                    return Ok((TokenKind::StartBlock, "{".to_string()));
                }
                b'}' => {
                    self.pos += 1;
                    return Ok((TokenKind::EndBlock, "}".to_string()));
                }
                quote @ (b'"' | b'\'') => return self.quoted_token(quote),
                _ => return Ok(self.bare_word()),
            }
        }
    }

    fn bare_word(&mut self) -> (TokenKind, String) {
        let start = self.pos;
        while self.pos < self.input.len() && !DELIMITERS.contains(&self.input[self.pos]) {
            self.pos += 1;
        }
        let word = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();
        (TokenKind::Normal, word)
    }

    // The surrounding quotes are retained in the token value. A backslash
    // escapes the next character literally. The closing quote must be
    // followed by a delimiter or end of input.
    fn quoted_token(&mut self, quote: u8) -> Result<(TokenKind, String), ConfigError> {
        let mut value = vec![quote];
        self.pos += 1;
        loop {
            if self.pos >= self.input.len() {
                return Err(ConfigError::UnterminatedQuote);
            }
            let byte = self.input[self.pos];
            self.pos += 1;
            if byte == b'\\' {
                if self.pos >= self.input.len() {
                    return Err(ConfigError::UnterminatedQuote);
                }
                value.push(self.input[self.pos]);
                self.pos += 1;
            } else {
                value.push(byte);
                if byte == quote {
                    break;
                }
            }
        }
        if self.pos < self.input.len() && !DELIMITERS.contains(&self.input[self.pos]) {
            return Err(ConfigError::QuoteNotDelimited);
        }
        Ok((TokenKind::Quoted, String::from_utf8_lossy(&value).into_owned()))
    }
}

fn transition_ok(last: TokenKind, next: TokenKind) -> bool {
    use TokenKind::*;
    match next {
        Normal | Quoted => matches!(
            last,
            Start | StatementEnd | StartBlock | EndBlock | Normal | Quoted
        ),
        StatementEnd => matches!(last, Normal | Quoted),
        StartBlock => matches!(last, Normal | Quoted),
        EndBlock => matches!(last, StatementEnd | EndBlock | StartBlock),
        Eof => matches!(last, Start | StatementEnd | EndBlock),
        _ => false,
    }
}

/// Parses config text into a statement tree. Empty input yields an empty
/// root block.
pub fn parse(input: &str) -> Result<Block, ConfigError> {
    let mut lexer = Lexer::new(input);
    // The root block sits at the bottom of the stack; nested blocks are
    // pushed on '{' and folded back into their parent statement on '}'.
    let mut blocks: Vec<Block> = vec![Block::default()];
    let mut pending_heads: Vec<Vec<String>> = Vec::new();
    let mut tokens: Vec<String> = Vec::new();
    let mut last = TokenKind::Start;

    loop {
        let (kind, value) = lexer.next_token()?;
        if !transition_ok(last, kind) {
            return Err(ConfigError::BadTransition(kind.as_str(), last.as_str()));
        }
        match kind {
            TokenKind::Normal | TokenKind::Quoted => tokens.push(value),
            TokenKind::StatementEnd => {
                let stmt = Statement {
                    tokens: std::mem::take(&mut tokens),
                    block: None,
                };
                blocks.last_mut().unwrap().statements.push(stmt);
            }
            TokenKind::StartBlock => {
                pending_heads.push(std::mem::take(&mut tokens));
                blocks.push(Block::default());
            }
            TokenKind::EndBlock => {
                if blocks.len() < 2 {
                    return Err(ConfigError::UnbalancedClose);
                }
                let block = blocks.pop().unwrap();
                let stmt = Statement {
                    tokens: pending_heads.pop().unwrap(),
                    block: Some(block),
                };
                blocks.last_mut().unwrap().statements.push(stmt);
            }
            TokenKind::Eof => {
                if blocks.len() != 1 {
                    return Err(ConfigError::UnclosedBlock);
                }
                return Ok(blocks.pop().unwrap());
            }
            _ => unreachable!("lexer yields no comment or error tokens"),
        }
        last = kind;
    }
}

pub fn parse_file(path: &str) -> Result<Block, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_string(),
        source,
    })?;
    parse(&text)
}

/// Extracts the `port <u16>;` directive from the top-level statements.
/// Ports outside 1-65535 are rejected.
pub fn listen_port(root: &Block) -> Result<u16, ConfigError> {
    for stmt in &root.statements {
        if stmt.tokens.first().map(String::as_str) == Some("port") {
            if stmt.tokens.len() != 2 || stmt.block.is_some() {
                return Err(ConfigError::InvalidPort);
            }
            let port: u32 = stmt.tokens[1].parse().map_err(|_| ConfigError::InvalidPort)?;
            if port == 0 || port > 65535 {
                return Err(ConfigError::InvalidPort);
            }
            return Ok(port as u16);
        }
    }
    Err(ConfigError::InvalidPort)
}
