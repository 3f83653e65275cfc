use shrike::config::{listen_port, parse, Block, ConfigError, Statement};

#[cfg(test)]
mod lexer_tests {
    use super::*;

    #[test]
    fn test_empty_input_is_valid() {
        let root = parse("").unwrap();
        assert!(root.statements.is_empty());
    }

    #[test]
    fn test_whitespace_and_comments_only() {
        let root = parse("# just a comment\n   \t\r\n# another\n").unwrap();
        assert!(root.statements.is_empty());
    }

    #[test]
    fn test_comment_runs_to_end_of_line() {
        let root = parse("port 8080; # listen here\nlocation /x EchoHandler { }\n").unwrap();
        assert_eq!(root.statements.len(), 2);
    }

    #[test]
    fn test_hash_inside_bare_word_is_literal() {
        let root = parse("tag a#b;").unwrap();
        assert_eq!(root.statements[0].tokens, vec!["tag", "a#b"]);
    }

    #[test]
    fn test_quoted_tokens_keep_their_quotes() {
        let root = parse(r#"greet "hello world";"#).unwrap();
        assert_eq!(root.statements[0].tokens[1], "\"hello world\"");

        let root = parse("greet 'hi there';").unwrap();
        assert_eq!(root.statements[0].tokens[1], "'hi there'");
    }

    #[test]
    fn test_backslash_escapes_next_char() {
        let root = parse(r#"greet "a\"b";"#).unwrap();
        assert_eq!(root.statements[0].tokens[1], "\"a\"b\"");
    }

    #[test]
    fn test_closing_quote_must_be_delimited() {
        assert!(matches!(
            parse(r#"greet "hi"x;"#),
            Err(ConfigError::QuoteNotDelimited)
        ));
    }

    #[test]
    fn test_unterminated_quote_fails() {
        assert!(matches!(
            parse(r#"greet "hi"#),
            Err(ConfigError::UnterminatedQuote)
        ));
        assert!(matches!(
            parse(r#"greet "hi\"#),
            Err(ConfigError::UnterminatedQuote)
        ));
    }
}

#[cfg(test)]
mod parser_tests {
    use super::*;

    #[test]
    fn test_simple_statement() {
        let root = parse("port 8080;").unwrap();
        assert_eq!(root.statements.len(), 1);
        assert_eq!(root.statements[0].tokens, vec!["port", "8080"]);
        assert!(root.statements[0].block.is_none());
    }

    #[test]
    fn test_nested_blocks() {
        let root = parse("location /echo EchoHandler { inner a; deeper { x y; } }").unwrap();
        let stmt = &root.statements[0];
        assert_eq!(stmt.tokens, vec!["location", "/echo", "EchoHandler"]);
        let block = stmt.block.as_ref().unwrap();
        assert_eq!(block.statements.len(), 2);
        assert_eq!(block.statements[0].tokens, vec!["inner", "a"]);
        assert!(block.statements[1].block.is_some());
    }

    #[test]
    fn test_empty_block_is_valid() {
        let root = parse("location /x EchoHandler { }").unwrap();
        assert!(root.statements[0]
            .block
            .as_ref()
            .unwrap()
            .statements
            .is_empty());
    }

    #[test]
    fn test_statement_without_terminator_fails() {
        assert!(matches!(
            parse("port 8080"),
            Err(ConfigError::BadTransition(_, _))
        ));
    }

    #[test]
    fn test_semicolon_without_statement_fails() {
        assert!(parse(";").is_err());
        assert!(parse("a b; ;").is_err());
    }

    #[test]
    fn test_block_without_head_fails() {
        assert!(parse("{ a b; }").is_err());
    }

    #[test]
    fn test_block_closing_on_open_statement_fails() {
        assert!(parse("outer { inner }").is_err());
    }

    #[test]
    fn test_stray_close_brace_fails() {
        assert!(parse("}").is_err());
        assert!(parse("a b; }").is_err());
    }

    #[test]
    fn test_unclosed_block_fails() {
        assert!(parse("outer { inner a;").is_err());
    }
}

#[cfg(test)]
mod serializer_tests {
    use super::*;

    #[test]
    fn test_canonical_form() {
        let root = parse("port 8080; location /s StaticHandler { root /tmp/www; }").unwrap();
        let expected = "port 8080;\nlocation /s StaticHandler {\n  root /tmp/www;\n}\n";
        assert_eq!(root.serialize(), expected);
    }

    #[test]
    fn test_round_trip_preserves_structure() {
        let text = r#"
            port 8080;
            location /s StaticHandler {
              root "/tmp/with space";
            }
            location /docs MarkdownHandler {
              root /tmp/docs;
              template /tmp/page.html;
            }
        "#;
        let tree = parse(text).unwrap();
        let reparsed = parse(&tree.serialize()).unwrap();
        assert_eq!(tree, reparsed);
    }

    #[test]
    fn test_round_trip_of_hand_built_tree() {
        let tree = Block {
            statements: vec![Statement {
                tokens: vec!["location".into(), "/a".into(), "EchoHandler".into()],
                block: Some(Block {
                    statements: vec![Statement {
                        tokens: vec!["note".into(), "\"quoted value\"".into()],
                        block: None,
                    }],
                }),
            }],
        };
        let reparsed = parse(&tree.serialize()).unwrap();
        assert_eq!(tree, reparsed);
    }
}

#[cfg(test)]
mod port_directive_tests {
    use super::*;

    #[test]
    fn test_port_parses() {
        assert_eq!(listen_port(&parse("port 8080;").unwrap()).unwrap(), 8080);
        assert_eq!(listen_port(&parse("port 1;").unwrap()).unwrap(), 1);
        assert_eq!(listen_port(&parse("port 65535;").unwrap()).unwrap(), 65535);
    }

    #[test]
    fn test_port_out_of_range_fails() {
        assert!(listen_port(&parse("port 0;").unwrap()).is_err());
        assert!(listen_port(&parse("port 65536;").unwrap()).is_err());
        assert!(listen_port(&parse("port 99999;").unwrap()).is_err());
    }

    #[test]
    fn test_port_malformed_or_missing_fails() {
        assert!(listen_port(&parse("port nope;").unwrap()).is_err());
        assert!(listen_port(&parse("port 80 81;").unwrap()).is_err());
        assert!(listen_port(&parse("").unwrap()).is_err());
    }
}
