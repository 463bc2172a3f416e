//! `brickgate contract`: print the parsed brick contract.

use anyhow::Result;

use crate::core::contract::BrickContract;
use crate::io::documents::read_contract;
use crate::io::paths::Workflow;

/// Read the contract document and render it for the terminal.
pub fn print_contract(workflow: &Workflow) -> Result<String> {
    let contract = read_contract(&workflow.paths.spec_path)?;
    Ok(render_contract(&contract))
}

/// Headline, brick, allowed files, then the non-blank lines of the
/// acceptance and scope sections exactly as written.
pub fn render_contract(contract: &BrickContract) -> String {
    let mut out = String::from("Brick Contract\n");
    out.push_str(&format!("brick: {}\n", contract.brick));
    out.push_str("allowed_files:\n");
    for path in &contract.allowed_files {
        out.push_str(&format!("- {path}\n"));
    }
    out.push_str("acceptance_criteria:\n");
    push_non_blank(&mut out, &contract.acceptance_criteria);
    out.push_str("scope_rules:\n");
    push_non_blank(&mut out, &contract.scope_rules);
    out
}

fn push_non_blank(out: &mut String, lines: &[String]) {
    for line in lines.iter().filter(|line| !line.trim().is_empty()) {
        out.push_str(line);
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TempWorkflow;

    #[test]
    fn renders_all_sections() {
        let contract = BrickContract::parse(
            "BRICK: add-cache\n\nFILES:\n- src/cache.rs\n- ./src/lib.rs\n\n\
             ACCEPTANCE CRITERIA:\n  - hits are served from memory\n\n\
             SCOPE:\nNo public API changes.\n",
        );
        assert_eq!(
            render_contract(&contract),
            "Brick Contract\nbrick: add-cache\nallowed_files:\n- src/cache.rs\n- src/lib.rs\n\
             acceptance_criteria:\n  - hits are served from memory\n\
             scope_rules:\nNo public API changes.\n"
        );
    }

    #[test]
    fn empty_contract_renders_empty_sections() {
        let wf = TempWorkflow::new("x").expect("workflow");
        wf.write("spec.md", "nothing structured here\n").expect("spec");
        assert_eq!(
            print_contract(&wf.workflow()).expect("print"),
            "Brick Contract\nbrick: \nallowed_files:\nacceptance_criteria:\nscope_rules:\n"
        );
    }
}
