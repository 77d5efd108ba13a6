use super::*;

fn tokens(input: &str) -> Vec<Token> {
    Lexer::new(input).map(|lexeme| lexeme.token).collect()
}

#[test]
fn test_basic_tokens() {
    let input = "
    var x: int = 5;
    def add(a: float69) -> int52 {}
    ";

    assert_eq!(
        tokens(input),
        vec![
            Token::KeywordVar,
            Token::Ident("x".to_string()),
            Token::Colon,
            Token::Type(Type::Int),
            Token::Assign,
            Token::Int(5),
            Token::Semicolon,
            Token::KeywordDef,
            Token::Ident("add".to_string()),
            Token::LParen,
            Token::Ident("a".to_string()),
            Token::Colon,
            Token::Type(Type::Float),
            Token::RParen,
            Token::Arrow,
            Token::Type(Type::Int),
            Token::LBrace,
            Token::RBrace,
        ]
    );
}

#[test]
fn test_operators_prefer_longest_match() {
    assert_eq!(
        tokens("<= < == = != ! -> - -= += *= /= ^ %"),
        vec![
            Token::LessEq,
            Token::Less,
            Token::Eq,
            Token::Assign,
            Token::NotEq,
            Token::Bang,
            Token::Arrow,
            Token::Minus,
            Token::SubAssign,
            Token::AddAssign,
            Token::MulAssign,
            Token::DivAssign,
            Token::Pow,
            Token::Mod,
        ]
    );
}

#[test]
fn test_keywords_do_not_swallow_identifiers() {
    assert_eq!(
        tokens("integer iffy while_ true"),
        vec![
            Token::Ident("integer".to_string()),
            Token::Ident("iffy".to_string()),
            Token::Ident("while_".to_string()),
            Token::KeywordTrue,
        ]
    );
}

#[test]
fn test_string_token() {
    let input = r#""hello\nworld \"quoted\"""#;
    assert_eq!(
        tokens(input),
        vec![Token::Str("hello\nworld \"quoted\"".to_string())]
    );
}

#[test]
fn test_numbers() {
    assert_eq!(
        tokens("42 3.5 7."),
        vec![Token::Int(42), Token::Float(3.5), Token::Float(7.0)]
    );
}

#[test]
fn test_malformed_numbers_become_unknown() {
    let toks = tokens("1.2.3 99999999999");
    assert_eq!(toks.len(), 2);
    assert!(matches!(&toks[0], Token::Unknown(text) if text == "1.2.3"));
    assert!(matches!(&toks[1], Token::Unknown(_)));
}

#[test]
fn test_int_literals_are_unsigned_i32() {
    assert_eq!(tokens("2147483647"), vec![Token::Int(i32::MAX)]);
    // `-` is a separate prefix operator, so i32::MIN has no literal form
    assert_eq!(
        tokens("-2147483648"),
        vec![Token::Minus, Token::Unknown("2147483648".to_string())]
    );
}

#[test]
fn test_error_recovery() {
    let toks = tokens("var @ x");
    assert_eq!(toks[0], Token::KeywordVar);
    assert_eq!(toks[1], Token::Unknown("@".to_string()));
    assert_eq!(toks[2], Token::Ident("x".to_string()));
}

#[test]
fn test_comments_are_skipped() {
    assert_eq!(
        tokens("1 # the rest is ignored ; var\n2"),
        vec![Token::Int(1), Token::Int(2)]
    );
}

#[test]
fn test_line_and_column() {
    let mut lexer = Lexer::new("var a\n  b");
    let var = lexer.next_token();
    assert_eq!((var.line, var.column), (1, 1));
    let a = lexer.next_token();
    assert_eq!((a.line, a.column), (1, 5));
    let b = lexer.next_token();
    assert_eq!((b.line, b.column), (2, 3));
    assert_eq!(b.span, 8..9);
}

#[test]
fn test_eof_is_sticky() {
    let mut lexer = Lexer::new("x");
    lexer.next_token();
    assert_eq!(lexer.next_token().token, Token::Eof);
    assert_eq!(lexer.next_token().token, Token::Eof);
}
