mod command;
mod expression;
mod lexer;
mod parser;

use hs_core::{CommandNode, ErrorDescriptor, Node, Program};

use lexer::Lexer;
use parser::Parser;

/// Parses a full script: a sequence of `on`, `def` and `init` features.
pub fn parse_program(source: &str) -> Result<Program, ErrorDescriptor> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(source, tokens).parse_program()
}

/// Parses a bare command sequence such as `add .a to me then wait 1s`.
pub fn parse_commands(source: &str) -> Result<Vec<CommandNode>, ErrorDescriptor> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser::new(source, tokens);
    let commands = parser.parse_command_list()?;
    finish(&parser)?;
    Ok(commands)
}

pub fn parse_expression(source: &str) -> Result<Node, ErrorDescriptor> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser::new(source, tokens);
    let node = parser.parse_expression()?;
    finish(&parser)?;
    Ok(node)
}

fn finish(parser: &Parser<'_>) -> Result<(), ErrorDescriptor> {
    if parser.at_end() {
        return Ok(());
    }
    Err(parser.error_here(
        "PARSE_TRAILING_INPUT",
        format!("Unexpected {} after a complete parse.", parser.describe_current()),
    ))
}

#[cfg(test)]
mod parser_tests {
    use hs_core::{BinaryOp, Feature, InsertPosition, Literal, Positional};

    use super::*;

    fn single_command(source: &str) -> CommandNode {
        let mut commands = parse_commands(source).expect("commands should parse");
        assert_eq!(commands.len(), 1, "expected one command in {:?}", source);
        commands.remove(0)
    }

    #[test]
    fn on_click_handler_parses_into_add_command() {
        let program = parse_program("on click add .active to me").expect("program should parse");
        let [Feature::On { events, from, body }] = program.features.as_slice() else {
            panic!("expected one on-feature, got {:?}", program.features);
        };
        assert_eq!(events, &vec!["click".to_string()]);
        assert!(from.is_none());
        assert_eq!(body.len(), 1);
        let add = &body[0];
        assert_eq!(add.name, "add");
        assert_eq!(
            add.args,
            vec![Node::ClassRef {
                name: "active".to_string()
            }]
        );
        assert_eq!(add.modifiers.get("to"), Some(&Node::identifier("me")));
        assert_eq!(add.source, "add .active to me");
        let span = add.span.clone().expect("span recorded");
        assert_eq!(span.start.column, 10);
    }

    #[test]
    fn multiple_features_and_handlers_split_on_feature_words() {
        let program = parse_program(
            "on click toggle .open then send opened to #log\n\
             on mouseenter or focus from #btn show me\n\
             def greet(name) return 'hi ' + name end\n\
             init set $count to 0",
        )
        .expect("program should parse");
        assert_eq!(program.features.len(), 4);
        assert!(matches!(
            &program.features[1],
            Feature::On { events, from: Some(_), .. } if events.len() == 2
        ));
        assert!(matches!(
            &program.features[2],
            Feature::Def { name, params, body } if name == "greet" && params == &vec!["name".to_string()] && body.len() == 1
        ));
        assert!(matches!(&program.features[3], Feature::Init { body } if body[0].name == "set"));
    }

    #[test]
    fn put_records_structured_position() {
        let command = single_command("put 'hello' at the end of #out");
        assert_eq!(command.position, Some(InsertPosition::AtEnd));
        assert!(command.modifiers.contains_key("at end of"));

        let command = single_command("put my value into the next");
        assert_eq!(command.position, Some(InsertPosition::Into));
        assert_eq!(
            command.args[0],
            Node::property(Node::identifier("me"), "value")
        );

        let error = parse_commands("put 1 onto #x").expect_err("unknown position");
        assert_eq!(error.code, "PARSE_PUT_POSITION");
        assert!(error.suggestions.iter().any(|s| s == "into"));
    }

    #[test]
    fn if_else_chains_share_one_end() {
        let command = single_command(
            "if x > 3 add .big to me else if x is 3 add .even to me else remove .big from me end",
        );
        assert_eq!(command.name, "if");
        assert_eq!(command.blocks.len(), 2);
        let nested = &command.blocks[1][0];
        assert_eq!(nested.name, "if");
        assert_eq!(nested.blocks.len(), 2);
        assert!(matches!(
            &nested.args[0],
            Node::Binary { op: BinaryOp::Equal, .. }
        ));
    }

    #[test]
    fn repeat_forms_map_to_modifiers() {
        let command = single_command("repeat 3 times increment $n end");
        assert_eq!(command.modifiers.get("times"), Some(&Node::number(3.0)));
        assert_eq!(command.blocks[0][0].name, "increment");

        let command = single_command("for item in [1, 2] log item end");
        assert_eq!(command.name, "repeat");
        assert_eq!(command.args, vec![Node::identifier("item")]);
        assert!(matches!(command.modifiers.get("in"), Some(Node::Array { items }) if items.len() == 2));

        let command = single_command("repeat while $n < 5 increment $n end");
        assert!(command.modifiers.contains_key("while"));

        let command = single_command("repeat forever break end");
        assert!(command.modifiers.contains_key("forever"));
        assert_eq!(command.blocks[0][0].name, "break");
    }

    #[test]
    fn wait_accepts_durations_and_events() {
        let command = single_command("wait 2s");
        assert_eq!(command.args, vec![Node::number(2000.0)]);

        let command = single_command("wait 150 milliseconds");
        assert_eq!(command.args, vec![Node::number(150.0)]);

        let command = single_command("wait for transitionend from #panel or 1s");
        assert_eq!(
            command.modifiers.get("for"),
            Some(&Node::string("transitionend"))
        );
        assert_eq!(
            command.modifiers.get("from"),
            Some(&Node::IdRef {
                id: "panel".to_string()
            })
        );
        assert_eq!(command.modifiers.get("or"), Some(&Node::number(1000.0)));
    }

    #[test]
    fn send_collects_detail_and_target() {
        let command = single_command("send refresh(count: 2, label: 'x') to <div.panel/>");
        assert_eq!(command.args, vec![Node::string("refresh")]);
        assert!(matches!(
            command.modifiers.get("detail"),
            Some(Node::Object { entries }) if entries.len() == 2 && entries[0].0 == "count"
        ));
        assert_eq!(
            command.modifiers.get("to"),
            Some(&Node::Query {
                selector: "<div.panel/>".to_string()
            })
        );
    }

    #[test]
    fn unknown_commands_still_parse_for_dispatch_validation() {
        let commands = parse_commands("ad .x then frobnicate 1, 2").expect("parse");
        assert_eq!(commands[0].name, "ad");
        assert_eq!(commands[1].name, "frobnicate");
        assert_eq!(commands[1].args.len(), 2);
    }

    #[test]
    fn expressions_follow_precedence() {
        let node = parse_expression("1 + 2 * 3 == 7 and not false").expect("expression");
        let Node::Binary { op: BinaryOp::And, left, right } = node else {
            panic!("expected and at the root");
        };
        assert!(matches!(*left, Node::Binary { op: BinaryOp::Equal, .. }));
        assert!(matches!(*right, Node::Unary { .. }));

        let node = parse_expression("first in <li/>").expect("positional");
        assert!(matches!(node, Node::Positional { which: Positional::First, .. }));

        let node = parse_expression("#box's @data-state").expect("possessive attribute");
        assert_eq!(
            node,
            Node::property(
                Node::IdRef {
                    id: "box".to_string()
                },
                "@data-state"
            )
        );

        let node = parse_expression("utils.format(1, null)").expect("call");
        assert!(matches!(
            node,
            Node::Call { ref callee, ref args } if callee == "utils.format" && args[1] == Node::Literal { value: Literal::Null }
        ));
    }

    #[test]
    fn syntax_errors_carry_spans() {
        let error = parse_program("click add .x").expect_err("missing on");
        assert_eq!(error.code, "PARSE_EXPECTED_FEATURE");
        assert_eq!(error.kind, hs_core::ErrorKind::SyntaxError);
        assert!(error.span.is_some());

        let error = parse_expression("1 +").expect_err("dangling operator");
        assert_eq!(error.code, "PARSE_UNEXPECTED_END");

        let error = parse_commands("add to me").expect_err("no class");
        assert_eq!(error.code, "PARSE_CLASS_EXPECTED");
    }
}
