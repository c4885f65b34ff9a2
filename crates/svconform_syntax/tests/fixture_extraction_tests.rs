//! Extraction tests over fixtures shaped like the conformance corpus.
//!
//! Each test feeds a whole fixture file through `extract` and checks the descriptor or the collected
//! malformed-fixture reasons.

use std::path::Path;

use svconform_core::{Arg, CoercionRules, Phase};
use svconform_syntax::{extract, extract_bytes};

const UNIQUE0_CASE: &str = r#"/*
:name: unique0_case
:description: unique0 case statement
:tags: 12.5.3
:type: simulation elaboration parsing
*/
module top();

logic [1:0] a = 3;
logic [1:0] b = 0;

always_comb begin
	unique0 case (a)
		0, 1: b = 1;
		2: b = 2;
		3: b = 3;
	endcase
end

endmodule
"#;

const FOUR_STATE_COMPARE: &str = r#"/*
:name: equality_x
:description: equality with an indeterminate bit
:tags: 11.4.5
:type: simulation elaboration parsing
*/
module top();
  logic [7:0] a = 8'b1101x001;
  logic [7:0] b = 8'b1101x001;
  logic c;
  initial begin
    c = a == b;
    $display(":assert: ('%s' == %d)", "x", c);
  end
endmodule
"#;

#[test]
fn unique0_case_has_no_directives() {
    let case = extract(Path::new("chapter-12/12.5.3--unique0_case.sv"), UNIQUE0_CASE).unwrap();
    assert_eq!(case.name, "unique0_case");
    assert!(case.directives.is_empty());
    assert!(case.declared_types.contains(&Phase::Simulation));
    assert_eq!(case.body, UNIQUE0_CASE);
}

#[test]
fn four_state_compare_directive_renders_false() {
    let case = extract(Path::new("chapter-11/equality_x.sv"), FOUR_STATE_COMPARE).unwrap();
    assert_eq!(case.directives.len(), 1);

    let directive = &case.directives[0];
    assert_eq!(directive.line, 14);
    assert_eq!(directive.args, vec![Arg::Str("x".into()), Arg::Symbolic("c".into())]);

    let rendered = directive.render(&CoercionRules::default()).unwrap();
    assert!(rendered.matches(":assert: ('x' == 0)"));
    assert!(!rendered.matches(":assert: ('x' == 1)"));
    insta::assert_snapshot!(rendered.to_string(), @":assert: ('x' == 0)");
}

#[test]
fn quoted_decimal_placeholder_keeps_its_quotes() {
    let src = FOUR_STATE_COMPARE.replace("('%s' == %d)", "('%s' == '%d')");
    let case = extract(Path::new("chapter-11/equality_x_quoted.sv"), &src).unwrap();
    assert_eq!(case.directives[0].format_template(), "('%s' == '%d')");

    // Rendering is byte-exact: quotes written in the template must appear in the output.
    let rendered = case.directives[0].render(&CoercionRules::default()).unwrap();
    assert_eq!(rendered.to_string(), ":assert: ('x' == '0')");
    assert!(rendered.matches(":assert: ('x' == '0')"));
    assert!(!rendered.matches(":assert: ('x' == 0)"));
    assert!(!rendered.matches(":assert: ('x' == '1')"));
}

#[test]
fn oversized_literal_makes_the_fixture_malformed() {
    let src = "/*\n:name: wide\n:type: simulation\n*/\nmodule top;\n  initial $display(\":assert: (%b)\", 1099511627776'b0);\nendmodule\n";
    let err = extract(Path::new("wide.sv"), src).unwrap_err();
    assert_eq!(err.name, "wide");
    assert_eq!(err.errors.len(), 1);
    assert!(err.reasons()[0].contains("exceeds the 65536-bit limit"), "{:?}", err.reasons());
}

#[test]
fn directives_with_literal_args_render_exactly() {
    let src = r#"/*
:name: literal_args
:type: simulation
*/
module top;
  initial begin
    $display(":assert: (%d %h %b %o)", 8'd42, 8'hA5, 4'b10z1, 12);
    $write(":assert: [%5d] [%-3s] [%0d]", 7, "ab", 255);
  end
endmodule
"#;
    let case = extract(Path::new("literal_args.sv"), src).unwrap();
    let rules = CoercionRules::default();
    let lines: Vec<String> = case
        .directives
        .iter()
        .map(|d| d.render(&rules).unwrap().to_string())
        .collect();
    insta::assert_snapshot!(lines.join("\n"), @r"
    :assert: ( 42 a5 10z1 00000000014)
    :assert: [    7] [ab ] [255]
    ");
}

#[test]
fn malformed_fixture_reports_every_problem() {
    let src = r#"/*
:name: broken
:name: broken_again
:type: parsing synthesis
:timeout: never
*/
module top;
  initial $display(":assert: (%d == %d)", a);
  initial $display(":assert: (%q)", a);
endmodule
"#;
    let err = extract(Path::new("broken.sv"), src).unwrap_err();
    assert_eq!(err.name, "broken");
    insta::assert_snapshot!(err.reasons().join("\n"), @r"
    line 3: metadata key `:name:` declared more than once
    line 4: unknown phase `synthesis` in `:type:`
    line 5: invalid `:timeout:` value `never`
    line 8: invalid assertion template: template has 2 placeholder(s) but 1 argument(s) were declared
    line 9: invalid assertion template: unsupported placeholder '%q'
    ");
}

#[test]
fn non_utf8_fixture_is_malformed_not_fatal() {
    let err = extract_bytes(Path::new("latin1.sv"), b"/* :name: caf\xe9 */").unwrap_err();
    assert_eq!(err.reasons(), vec!["fixture is not valid UTF-8".to_string()]);
}

#[test]
fn directive_inside_string_or_comment_is_not_a_directive() {
    let src = "/*\n:name: quoted\n*/\nmodule top;\n  initial $display(\"$display(\\\":assert: (1)\\\")\");\n  // $display(\":assert: (2)\");\nendmodule\n";
    let case = extract(Path::new("quoted.sv"), src).unwrap();
    assert!(case.directives.is_empty());
}
