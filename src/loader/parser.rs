//! Textual IR parser
//!
//! Parses the same line-oriented form that the display implementations
//! produce. `;` starts a comment that runs to the end of the line.

use crate::error::{ErrorKind, Result};
use crate::ir::{
    Block, DebugEntity, DebugScope, Decoration, DecorationKind, Function, Id, InlinedAtRecord,
    Instruction, Module, Opcode, Operand, Parameter, SourceLocation, StorageClass,
};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, line_ending, not_line_ending},
    combinator::{all_consuming, map, map_opt, map_res, opt},
    multi::many0,
    sequence::{delimited, pair, preceded, separated_pair, tuple},
    IResult,
};
use std::str::FromStr;

/// Parses a complete module from its textual form.
pub fn parse_module(source: &str) -> Result<Module> {
    match all_consuming(terminated_module)(source) {
        Ok((_, module)) => Ok(module),
        Err(nom::Err::Error((rest, _))) | Err(nom::Err::Failure((rest, _))) => {
            let consumed = &source[..source.len() - rest.len()];
            let line = consumed.chars().filter(|&c| c == '\n').count() + 1;
            Err(ErrorKind::Parser(format!("syntax error at line {}", line)).into())
        }
        Err(nom::Err::Incomplete(_)) => {
            Err(ErrorKind::Parser("unexpected end of input".to_owned()).into())
        }
    }
}

enum Item {
    Name(Id, String),
    Decoration(Decoration),
    Entity(Id, DebugEntity),
    Global(Instruction),
    Function(Function),
}

fn terminated_module(input: &str) -> IResult<&str, Module> {
    let (input, module) = module(input)?;
    let (input, _) = blank_lines(input)?;
    let (input, _) = hspace0(input)?;
    let (input, _) = opt(comment)(input)?;
    Ok((input, module))
}

fn module(input: &str) -> IResult<&str, Module> {
    map(many0(delimited(blank_lines, item, line_end)), |items| {
        let mut module = Module::new();
        for item in items {
            match item {
                Item::Name(target, name) => module.set_name(target, &name),
                Item::Decoration(decoration) => module.add_decoration(decoration),
                Item::Entity(entity, record) => module.add_debug_entity(entity, record),
                Item::Global(global) => {
                    module.add_global(global);
                }
                Item::Function(function) => {
                    module.add_function(function);
                }
            }
        }
        module
    })(input)
}

fn item(input: &str) -> IResult<&str, Item> {
    preceded(
        hspace0,
        alt((
            name_item,
            decoration_item,
            debug_function_item,
            debug_lexical_block_item,
            debug_local_variable_item,
            debug_inlined_at_item,
            map(function, Item::Function),
            map(instruction, Item::Global),
        )),
    )(input)
}

fn hspace0(input: &str) -> IResult<&str, &str> {
    take_while(|c| c == ' ' || c == '\t')(input)
}

fn hspace1(input: &str) -> IResult<&str, &str> {
    take_while1(|c| c == ' ' || c == '\t')(input)
}

fn comment(input: &str) -> IResult<&str, &str> {
    preceded(char(';'), not_line_ending)(input)
}

/// Optional trailing comment, then the end of the line or of the input.
fn line_end(input: &str) -> IResult<&str, ()> {
    let (input, _) = hspace0(input)?;
    let (input, _) = opt(comment)(input)?;
    if input.is_empty() {
        return Ok((input, ()));
    }
    map(line_ending, |_| ())(input)
}

fn blank_lines(input: &str) -> IResult<&str, ()> {
    map(many0(tuple((hspace0, opt(comment), line_ending))), |_| ())(input)
}

fn id(input: &str) -> IResult<&str, Id> {
    preceded(char('%'), map_res(digit1, FromStr::from_str))(input)
}

fn integer(input: &str) -> IResult<&str, u32> {
    map_res(digit1, FromStr::from_str)(input)
}

fn word(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

fn quoted(input: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_while(|c| c != '"'), char('"'))(input)
}

fn opcode(input: &str) -> IResult<&str, Opcode> {
    map_opt(word, Opcode::from_mnemonic)(input)
}

fn operand(input: &str) -> IResult<&str, Vec<Operand>> {
    alt((
        phi_pair,
        map(id, |operand| vec![Operand::Id(operand)]),
        map(integer, |literal| vec![Operand::Literal(literal)]),
        map_opt(word, |mnemonic| {
            StorageClass::from_mnemonic(mnemonic)
                .map(|storage| vec![Operand::Storage(storage)])
        }),
    ))(input)
}

fn phi_pair(input: &str) -> IResult<&str, Vec<Operand>> {
    // [%5 %20]
    map(
        tuple((char('['), hspace0, id, hspace1, id, hspace0, char(']'))),
        |(_, _, value, _, predecessor, _, _)| {
            vec![Operand::Id(value), Operand::Block(predecessor)]
        },
    )(input)
}

fn operands(input: &str) -> IResult<&str, Vec<Operand>> {
    map(many0(preceded(hspace1, operand)), |groups| {
        groups.into_iter().flatten().collect()
    })(input)
}

fn result_header(input: &str) -> IResult<&str, (Id, Option<Id>)> {
    // %13 : %1 =    or    %1 =
    map(
        tuple((
            id,
            opt(preceded(tuple((hspace1, char(':'), hspace1)), id)),
            hspace1,
            char('='),
            hspace1,
        )),
        |(result, result_type, _, _, _)| (result, result_type),
    )(input)
}

fn scope_attribute(input: &str) -> IResult<&str, DebugScope> {
    // @ scope %30 inlined %31
    map(
        tuple((
            hspace1,
            char('@'),
            hspace1,
            tag("scope"),
            hspace1,
            id,
            opt(preceded(tuple((hspace1, tag("inlined"), hspace1)), id)),
        )),
        |(_, _, _, _, _, lexical_scope, inlined_at)| DebugScope::new(lexical_scope, inlined_at),
    )(input)
}

fn line_attribute(input: &str) -> IResult<&str, SourceLocation> {
    // @ line 7:3
    map(
        tuple((
            hspace1,
            char('@'),
            hspace1,
            tag("line"),
            hspace1,
            integer,
            char(':'),
            integer,
        )),
        |(_, _, _, _, _, line, _, column)| SourceLocation::new(line, column),
    )(input)
}

/// The textual form gives no distinction between plain id operands and block
/// label operands, the opcode decides.
fn fix_block_operands(op: Opcode, operands: Vec<Operand>) -> Vec<Operand> {
    operands
        .into_iter()
        .enumerate()
        .map(|(index, operand)| match operand {
            Operand::Id(target) if op.is_block_operand(index) => Operand::Block(target),
            other => other,
        })
        .collect()
}

fn instruction(input: &str) -> IResult<&str, Instruction> {
    map(
        tuple((
            opt(result_header),
            opcode,
            operands,
            opt(scope_attribute),
            opt(line_attribute),
        )),
        |(header, op, raw_operands, scope, line)| {
            let (result, result_type) = match header {
                Some((result, result_type)) => (Some(result), result_type),
                None => (None, None),
            };
            let mut instruction =
                Instruction::new(op, result, result_type, fix_block_operands(op, raw_operands));
            instruction.set_scope(scope);
            instruction.set_line(line);
            instruction
        },
    )(input)
}

fn name_item(input: &str) -> IResult<&str, Item> {
    // name %22 "tmp"
    map(
        tuple((tag("name"), hspace1, id, hspace1, quoted)),
        |(_, _, target, _, name)| Item::Name(target, name.to_owned()),
    )(input)
}

fn decoration_item(input: &str) -> IResult<&str, Item> {
    // decorate %5 Location 3
    map(
        tuple((
            tag("decorate"),
            hspace1,
            id,
            hspace1,
            map_opt(word, DecorationKind::from_mnemonic),
            many0(preceded(hspace1, integer)),
        )),
        |(_, _, target, _, kind, literals)| {
            Item::Decoration(Decoration::new(target, kind, literals))
        },
    )(input)
}

fn debug_function_item(input: &str) -> IResult<&str, Item> {
    // debug_function %30 "f" line 1 function %20
    let (input, _) = tag("debug_function")(input)?;
    let (input, entity) = preceded(hspace1, id)(input)?;
    let (input, name) = preceded(hspace1, quoted)(input)?;
    let (input, line) = preceded(tuple((hspace1, tag("line"), hspace1)), integer)(input)?;
    let (input, function) = preceded(tuple((hspace1, tag("function"), hspace1)), id)(input)?;
    Ok((
        input,
        Item::Entity(
            entity,
            DebugEntity::Function {
                name: name.to_owned(),
                line,
                function,
            },
        ),
    ))
}

fn debug_lexical_block_item(input: &str) -> IResult<&str, Item> {
    // debug_lexical_block %33 line 4 parent %30
    let (input, _) = tag("debug_lexical_block")(input)?;
    let (input, entity) = preceded(hspace1, id)(input)?;
    let (input, line) = preceded(tuple((hspace1, tag("line"), hspace1)), integer)(input)?;
    let (input, parent) = preceded(tuple((hspace1, tag("parent"), hspace1)), id)(input)?;
    Ok((
        input,
        Item::Entity(entity, DebugEntity::LexicalBlock { line, parent }),
    ))
}

fn debug_local_variable_item(input: &str) -> IResult<&str, Item> {
    // debug_local_variable %31 "x" line 3 parent %30
    let (input, _) = tag("debug_local_variable")(input)?;
    let (input, entity) = preceded(hspace1, id)(input)?;
    let (input, name) = preceded(hspace1, quoted)(input)?;
    let (input, line) = preceded(tuple((hspace1, tag("line"), hspace1)), integer)(input)?;
    let (input, parent) = preceded(tuple((hspace1, tag("parent"), hspace1)), id)(input)?;
    Ok((
        input,
        Item::Entity(
            entity,
            DebugEntity::LocalVariable {
                name: name.to_owned(),
                line,
                parent,
            },
        ),
    ))
}

fn debug_inlined_at_item(input: &str) -> IResult<&str, Item> {
    // debug_inlined_at %32 line 9 scope %31 inlined %34
    let (input, _) = tag("debug_inlined_at")(input)?;
    let (input, entity) = preceded(hspace1, id)(input)?;
    let (input, line) = preceded(tuple((hspace1, tag("line"), hspace1)), integer)(input)?;
    let (input, scope) = preceded(tuple((hspace1, tag("scope"), hspace1)), id)(input)?;
    let (input, inlined) =
        opt(preceded(tuple((hspace1, tag("inlined"), hspace1)), id))(input)?;
    Ok((
        input,
        Item::Entity(
            entity,
            DebugEntity::InlinedAt(InlinedAtRecord::new(line, scope, inlined)),
        ),
    ))
}

fn parameter(input: &str) -> IResult<&str, Parameter> {
    // param %11 : %2
    map(
        delimited(
            tuple((hspace0, tag("param"), hspace1)),
            separated_pair(id, tuple((hspace1, char(':'), hspace1)), id),
            line_end,
        ),
        |(parameter_id, type_id)| Parameter::new(parameter_id, type_id),
    )(input)
}

fn block(input: &str) -> IResult<&str, Block> {
    // block %12 { ... }
    let (input, label) = delimited(
        tuple((hspace0, tag("block"), hspace1)),
        id,
        tuple((hspace1, char('{'), line_end)),
    )(input)?;
    let (input, mut lines) = many0(delimited(hspace0, instruction, line_end))(input)?;
    let (input, _) = tuple((hspace0, char('}'), line_end))(input)?;

    let terminator = match lines.pop() {
        Some(last) if last.opcode().is_terminator() => last,
        _ => return Err(nom::Err::Failure((input, nom::error::ErrorKind::Verify))),
    };
    let mut block = Block::new(label);
    if lines.last().map_or(false, |last| last.opcode().is_merge()) {
        if let Some(merge) = lines.pop() {
            block.set_merge(merge);
        }
    }
    for line in lines {
        block.add_instruction(line);
    }
    block.set_terminator(terminator);
    Ok((input, block))
}

fn function(input: &str) -> IResult<&str, Function> {
    // function %10 type %3 returns %1 { ... }
    let (input, _) = tag("function")(input)?;
    let (input, function_id) = preceded(hspace1, id)(input)?;
    let (input, function_type) =
        preceded(tuple((hspace1, tag("type"), hspace1)), id)(input)?;
    let (input, return_type) =
        preceded(tuple((hspace1, tag("returns"), hspace1)), id)(input)?;
    let (input, _) = tuple((hspace1, char('{'), line_end))(input)?;
    let (input, parameters) = many0(parameter)(input)?;
    let (input, declarations) = many0(delimited(hspace0, instruction, line_end))(input)?;
    let (input, blocks) = many0(block)(input)?;
    let (input, _) = pair(hspace0, char('}'))(input)?;

    let mut function = Function::new(function_id, return_type, function_type);
    for parameter in parameters {
        function.add_parameter(parameter.id(), parameter.type_id());
    }
    for declaration in declarations {
        function.add_debug_declaration(declaration);
    }
    for block in blocks {
        function.add_block(block);
    }
    Ok((input, function))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_should_accept_the_rendered_form_of_a_module() {
        // GIVEN
        let mut module = Module::new();
        module.add_global(Instruction::type_float(1, 32));
        module.add_global(Instruction::type_pointer(2, StorageClass::Function, 1));
        module.add_global(Instruction::type_function(3, 1, &[2]));
        module.add_global(Instruction::type_void(4));
        module.add_global(Instruction::type_function(5, 4, &[]));
        module.add_global(Instruction::type_bool(6));
        module.add_global(Instruction::constant_true(7, 6));
        module.set_name(10, "helper");
        module.add_decoration(Decoration::new(11, DecorationKind::Location, vec![2]));
        module.add_debug_entity(
            30,
            DebugEntity::Function {
                name: "helper".to_owned(),
                line: 1,
                function: 10,
            },
        );
        module.add_debug_entity(
            31,
            DebugEntity::InlinedAt(InlinedAtRecord::new(9, 30, None)),
        );

        let mut callee = Function::new(10, 1, 3);
        callee.add_parameter(11, 2);
        let body = callee.new_block(12);
        body.variable(13, 2, StorageClass::Function, Some(7));
        let load = body.load(14, 1, 11);
        load.set_scope(Some(DebugScope::new(30, Some(31))));
        load.set_line(Some(SourceLocation::new(4, 9)));
        body.selection_merge(15);
        body.branch_conditional(7, 15, 15);
        let merge = callee.new_block(15);
        merge.phi(16, 1, &[(14, 12)]);
        merge.return_value(16);
        module.add_function(callee);

        // WHEN
        let parsed = parse_module(&module.to_string()).unwrap();

        // THEN
        assert_eq!(parsed, module);
    }

    #[test]
    fn test_parser_should_skip_comments_and_blank_lines() {
        // GIVEN
        let source = r#"
; a loaded module
%1 = TypeVoid
%2 = TypeFunction %1   ; one function type

function %10 type %2 returns %1 {
    block %11 {
        Return
    }
}
"#;

        // WHEN
        let module = parse_module(source).unwrap();

        // THEN
        assert_eq!(module.globals().len(), 2);
        let function = module.function(10).unwrap();
        assert_eq!(function.blocks().len(), 1);
        assert_eq!(
            function.blocks()[0].terminator().opcode(),
            Opcode::Return
        );
    }

    #[test]
    fn test_parser_should_classify_branch_targets_as_block_operands() {
        // GIVEN
        let source = "function %10 type %2 returns %1 {\n    block %11 {\n        BranchConditional %7 %12 %13\n    }\n    block %12 {\n        Return\n    }\n    block %13 {\n        Return\n    }\n}\n";

        // WHEN
        let module = parse_module(source).unwrap();

        // THEN
        let entry = &module.function(10).unwrap().blocks()[0];
        assert_eq!(entry.successor_labels(), vec![12, 13]);
        assert_eq!(
            entry.terminator().operands(),
            &[Operand::Id(7), Operand::Block(12), Operand::Block(13)]
        );
    }

    #[test]
    fn test_parser_should_parse_phi_incoming_pairs() {
        // GIVEN
        let source = "function %10 type %2 returns %1 {\n    block %11 {\n        %5 : %3 = Phi [%6 %12] [%7 %13]\n        Return\n    }\n}\n";

        // WHEN
        let module = parse_module(source).unwrap();

        // THEN
        let block = &module.function(10).unwrap().blocks()[0];
        assert_eq!(
            block.instruction(0),
            Some(&Instruction::phi(5, 3, &[(6, 12), (7, 13)]))
        );
    }

    #[test]
    fn test_blocks_without_a_terminator_should_be_rejected() {
        // GIVEN
        let source = "function %10 type %2 returns %1 {\n    block %11 {\n        %5 : %3 = Load %4\n    }\n}\n";

        // WHEN
        let result = parse_module(source);

        // THEN
        assert!(result.is_err());
    }

    #[test]
    fn test_trailing_garbage_should_be_rejected() {
        // GIVEN
        let source = "%1 = TypeVoid\nnot an instruction\n";

        // WHEN
        let result = parse_module(source);

        // THEN
        assert!(result.is_err());
    }

    #[test]
    fn test_syntax_errors_should_report_the_line() {
        // GIVEN
        let source = "%1 = TypeVoid\n%2 = TypeBool\n%%% broken\n";

        // WHEN
        let error = parse_module(source).unwrap_err();

        // THEN
        assert!(error.to_string().contains("line 3"));
    }
}
