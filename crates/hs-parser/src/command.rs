use hs_core::{CommandNode, ErrorDescriptor, Feature, InsertPosition, Node, Program};

use crate::lexer::TokenKind;
use crate::parser::{Parser, FEATURE_WORDS};

impl<'a> Parser<'a> {
    pub(crate) fn parse_program(&mut self) -> Result<Program, ErrorDescriptor> {
        let mut features = Vec::new();
        while !self.at_end() {
            features.push(self.parse_feature()?);
        }
        Ok(Program { features })
    }

    fn parse_feature(&mut self) -> Result<Feature, ErrorDescriptor> {
        if self.accept_ident("on") {
            let mut events = vec![self.parse_event_name()?];
            while self.accept_ident("or") || self.accept_symbol(",") {
                events.push(self.parse_event_name()?);
            }
            let from = if self.accept_ident("from") {
                Some(self.parse_expression()?)
            } else {
                None
            };
            let body = self.parse_command_list()?;
            self.accept_ident("end");
            return Ok(Feature::On { events, from, body });
        }
        if self.accept_ident("def") {
            let mut name = self.expect_name("a function name")?;
            while self.accept_symbol(".") {
                name.push('.');
                name.push_str(&self.expect_name("a function name")?);
            }
            let mut params = Vec::new();
            if self.accept_symbol("(") && !self.accept_symbol(")") {
                loop {
                    params.push(self.expect_name("a parameter name")?);
                    if self.accept_symbol(")") {
                        break;
                    }
                    self.expect_symbol(",")?;
                }
            }
            let body = self.parse_command_list()?;
            self.expect_block_end()?;
            return Ok(Feature::Def { name, params, body });
        }
        if self.accept_ident("init") {
            let body = self.parse_command_list()?;
            self.accept_ident("end");
            return Ok(Feature::Init { body });
        }
        Err(self
            .error_here(
                "PARSE_EXPECTED_FEATURE",
                format!("Expected 'on', 'def' or 'init' but found {}.", self.describe_current()),
            )
            .suggest("Start event handlers with 'on <event>', e.g. 'on click add .active to me'."))
    }

    fn parse_event_name(&mut self) -> Result<String, ErrorDescriptor> {
        self.expect_name("an event name")
    }

    /// Commands up to `end`/`else`, the next feature, or the end of input.
    pub(crate) fn parse_command_list(&mut self) -> Result<Vec<CommandNode>, ErrorDescriptor> {
        let mut commands = Vec::new();
        loop {
            while self.accept_ident("then") {}
            let Some(token) = self.peek() else {
                break;
            };
            if let Some(word) = token.ident() {
                if matches!(word, "end" | "else" | "otherwise") || FEATURE_WORDS.contains(&word) {
                    break;
                }
            }
            commands.push(self.parse_command()?);
        }
        Ok(commands)
    }

    pub(crate) fn parse_command(&mut self) -> Result<CommandNode, ErrorDescriptor> {
        let start = self.index;
        let name = match self.peek().map(|token| token.kind.clone()) {
            Some(TokenKind::Ident(name)) => {
                self.index += 1;
                name
            }
            _ => {
                return Err(self.error_here(
                    "PARSE_EXPECTED_COMMAND",
                    format!("Expected a command but found {}.", self.describe_current()),
                ))
            }
        };

        let mut command = match name.as_str() {
            "add" => self.parse_class_command("add", "to")?,
            "remove" => self.parse_remove()?,
            "toggle" => self.parse_class_command("toggle", "on")?,
            "put" => self.parse_put()?,
            "set" => self.parse_set()?,
            "get" | "call" => CommandNode::new(name.as_str()).arg(self.parse_expression()?),
            "log" => {
                let mut command = CommandNode::new("log").arg(self.parse_expression()?);
                while self.accept_symbol(",") {
                    command.args.push(self.parse_expression()?);
                }
                command
            }
            "hide" | "show" => {
                let mut command = CommandNode::new(name.as_str());
                if self.starts_expression() {
                    command.args.push(self.parse_expression()?);
                }
                command
            }
            "wait" => self.parse_wait()?,
            "send" | "trigger" => self.parse_send(&name)?,
            "increment" | "decrement" => {
                let mut command = CommandNode::new(name.as_str()).arg(self.parse_expression()?);
                if self.accept_ident("by") {
                    command
                        .modifiers
                        .insert("by".to_string(), self.parse_expression()?);
                }
                command
            }
            "if" => self.parse_if()?,
            "repeat" => self.parse_repeat()?,
            "for" => {
                let variable = self.expect_name("a loop variable")?;
                self.expect_ident("in")?;
                let source = self.parse_expression()?;
                let body = self.parse_command_list()?;
                self.expect_block_end()?;
                CommandNode::new("repeat")
                    .arg(Node::identifier(variable))
                    .modifier("in", source)
                    .block(body)
            }
            "tell" => {
                let target = self.parse_expression()?;
                let body = self.parse_command_list()?;
                self.expect_block_end()?;
                CommandNode::new("tell").arg(target).block(body)
            }
            "return" => {
                let mut command = CommandNode::new("return");
                if self.starts_expression() {
                    command.args.push(self.parse_expression()?);
                }
                command
            }
            "halt" => {
                if self.accept_ident("the") {
                    self.accept_ident("event");
                }
                CommandNode::new("halt")
            }
            "break" | "continue" | "exit" => CommandNode::new(name.as_str()),
            _ => {
                // Unknown words still become commands so the dispatcher can report them.
                let mut command = CommandNode::new(name.as_str());
                while self.starts_expression() {
                    command.args.push(self.parse_expression()?);
                    self.accept_symbol(",");
                }
                command
            }
        };

        let (source, span) = self.slice_since(start);
        command.source = source;
        command.span = Some(span);
        Ok(command)
    }

    fn parse_class_item(&mut self) -> Result<Option<Node>, ErrorDescriptor> {
        let node = match self.peek().map(|token| token.kind.clone()) {
            Some(TokenKind::ClassRef(name)) => Node::ClassRef { name },
            Some(TokenKind::AttrRef(name)) => {
                self.index += 1;
                let value = if self.accept_symbol("=") {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                return Ok(Some(match value {
                    Some(value) => Node::binary(
                        hs_core::BinaryOp::Equal,
                        Node::AttributeRef { name },
                        value,
                    ),
                    None => Node::AttributeRef { name },
                }));
            }
            Some(TokenKind::Str(value)) => Node::string(value),
            _ => return Ok(None),
        };
        self.index += 1;
        Ok(Some(node))
    }

    fn parse_class_command(&mut self, name: &str, target_word: &str) -> Result<CommandNode, ErrorDescriptor> {
        let mut command = CommandNode::new(name);
        while let Some(item) = self.parse_class_item()? {
            command.args.push(item);
        }
        if command.args.is_empty() {
            return Err(self
                .error_here(
                    "PARSE_CLASS_EXPECTED",
                    format!("'{}' expects a class (.name) or attribute (@name).", name),
                )
                .suggest(format!("{} .active", name)));
        }
        if self.accept_ident(target_word) {
            command
                .modifiers
                .insert(target_word.to_string(), self.parse_expression()?);
        }
        Ok(command)
    }

    fn parse_remove(&mut self) -> Result<CommandNode, ErrorDescriptor> {
        let mut command = CommandNode::new("remove");
        while let Some(item) = self.parse_class_item()? {
            command.args.push(item);
        }
        if command.args.is_empty() {
            if self.starts_expression() {
                command.args.push(self.parse_expression()?);
            }
            return Ok(command);
        }
        if self.accept_ident("from") {
            command
                .modifiers
                .insert("from".to_string(), self.parse_expression()?);
        }
        Ok(command)
    }

    fn parse_put(&mut self) -> Result<CommandNode, ErrorDescriptor> {
        let value = self.parse_expression()?;
        let position = if self.accept_ident("into") {
            InsertPosition::Into
        } else if self.accept_ident("before") {
            InsertPosition::Before
        } else if self.accept_ident("after") {
            InsertPosition::After
        } else if self.accept_ident("at") {
            self.accept_ident("the");
            let position = if self.accept_ident("start") || self.accept_ident("beginning") {
                InsertPosition::AtStart
            } else {
                self.expect_ident("end")?;
                InsertPosition::AtEnd
            };
            self.expect_ident("of")?;
            position
        } else {
            return Err(self
                .error_here(
                    "PARSE_PUT_POSITION",
                    format!("Expected a put position but found {}.", self.describe_current()),
                )
                .suggest_all(["into", "before", "after", "at start of", "at end of"]));
        };
        let target = self.parse_expression()?;
        let mut command = CommandNode::new("put")
            .arg(value)
            .modifier(position.keyword(), target);
        command.position = Some(position);
        Ok(command)
    }

    fn parse_set(&mut self) -> Result<CommandNode, ErrorDescriptor> {
        let place = self.parse_expression()?;
        self.expect_ident("to")?;
        let value = self.parse_expression()?;
        Ok(CommandNode::new("set").arg(place).modifier("to", value))
    }

    fn parse_wait(&mut self) -> Result<CommandNode, ErrorDescriptor> {
        let mut command = CommandNode::new("wait");
        let waits_for_event = self.accept_ident("for")
            && !matches!(self.peek().map(|token| &token.kind), Some(TokenKind::Number { .. }));
        if !waits_for_event {
            command.args.push(self.parse_expression()?);
            return Ok(command);
        }
        let event = self.parse_event_name()?;
        command.modifiers.insert("for".to_string(), Node::string(event));
        if self.accept_ident("from") {
            command
                .modifiers
                .insert("from".to_string(), self.parse_operand()?);
        }
        if self.accept_ident("or") {
            command
                .modifiers
                .insert("or".to_string(), self.parse_expression()?);
        }
        Ok(command)
    }

    fn parse_send(&mut self, name: &str) -> Result<CommandNode, ErrorDescriptor> {
        let event = self.parse_event_name()?;
        let mut command = CommandNode::new(name).arg(Node::string(event));
        if self.peek().is_some_and(|token| token.is_symbol("(") && !token.spaced) {
            self.index += 1;
            let entries = self.parse_named_entries(")")?;
            command
                .modifiers
                .insert("detail".to_string(), Node::Object { entries });
        }
        if self.accept_ident("to") || self.accept_ident("on") {
            command
                .modifiers
                .insert("to".to_string(), self.parse_expression()?);
        }
        Ok(command)
    }

    fn parse_if(&mut self) -> Result<CommandNode, ErrorDescriptor> {
        let condition = self.parse_expression()?;
        let then_block = self.parse_command_list()?;
        let mut command = CommandNode::new("if").arg(condition).block(then_block);
        if self.accept_ident("else") || self.accept_ident("otherwise") {
            if self.check_ident("if") {
                // `else if` chains share the innermost `end`.
                let nested = self.parse_command()?;
                command.blocks.push(vec![nested]);
                return Ok(command);
            }
            let else_block = self.parse_command_list()?;
            command.blocks.push(else_block);
        }
        self.expect_block_end()?;
        Ok(command)
    }

    fn parse_repeat(&mut self) -> Result<CommandNode, ErrorDescriptor> {
        let mut command = CommandNode::new("repeat");
        if self.accept_ident("for") {
            let variable = self.expect_name("a loop variable")?;
            self.expect_ident("in")?;
            command.args.push(Node::identifier(variable));
            command
                .modifiers
                .insert("in".to_string(), self.parse_expression()?);
        } else if self.accept_ident("in") {
            command
                .modifiers
                .insert("in".to_string(), self.parse_expression()?);
        } else if self.accept_ident("while") {
            command
                .modifiers
                .insert("while".to_string(), self.parse_expression()?);
        } else if self.accept_ident("until") {
            command
                .modifiers
                .insert("until".to_string(), self.parse_expression()?);
        } else if self.accept_ident("forever") {
            command
                .modifiers
                .insert("forever".to_string(), Node::boolean(true));
        } else {
            let count = self.parse_expression()?;
            self.expect_ident("times")?;
            command.modifiers.insert("times".to_string(), count);
        }
        let body = self.parse_command_list()?;
        self.expect_block_end()?;
        Ok(command.block(body))
    }
}
