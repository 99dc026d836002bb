//! Contract review fan-out: legal, compliance and financial analysis, then a summary

use crate::llm::LLMProvider;
use crate::workflow::{Parallel, ParallelExecutionTrace, ParallelOutput, Step, WorkflowResult};

/// Branch keys
pub const LEGAL: &str = "legal";
pub const COMPLIANCE: &str = "compliance";
pub const FINANCIAL: &str = "financial";

/// Characters of the contract quoted in the summary prompt
pub const SUMMARY_EXCERPT_CHARS: usize = 500;

/// Contract analyzed when none is given
pub const SAMPLE_CONTRACT: &str = r#"
CONSULTING AGREEMENT

This Consulting Agreement (the "Agreement") is made effective as of January 1, 2025 (the "Effective Date"), by and between ABC Corporation, a Delaware corporation ("Client"), and XYZ Consulting LLC, a California limited liability company ("Consultant").

1. SERVICES. Consultant shall provide Client with the following services: strategic business consulting, market analysis, and technology implementation advice (the "Services").

2. TERM. This Agreement shall commence on the Effective Date and shall continue for a period of 12 months, unless earlier terminated.

3. COMPENSATION. Client shall pay Consultant a fee of $10,000 per month for Services rendered. Payment shall be made within 30 days of receipt of Consultant's invoice.

4. CONFIDENTIALITY. Consultant acknowledges that during the engagement, Consultant may have access to confidential information. Consultant agrees to maintain the confidentiality of all such information.

5. INTELLECTUAL PROPERTY. All materials developed by Consultant shall be the property of Client. Consultant assigns all right, title, and interest in such materials to Client.

6. TERMINATION. Either party may terminate this Agreement with 30 days' written notice. Client shall pay Consultant for Services performed through the termination date.

7. GOVERNING LAW. This Agreement shall be governed by the laws of the State of Delaware.

8. LIMITATION OF LIABILITY. Consultant's liability shall be limited to the amount of fees paid by Client under this Agreement.

9. INDEMNIFICATION. Client shall indemnify Consultant against all claims arising from use of materials provided by Client.

10. ENTIRE AGREEMENT. This Agreement constitutes the entire understanding between the parties and supersedes all prior agreements.

IN WITNESS WHEREOF, the parties have executed this Agreement as of the date first above written.
"#;

const ANALYSIS_PROMPT: &str = "Please analyze the following contract text:\n\n{{input}}";

fn specialist(key: &str, system_prompt: &str) -> Step {
    Step::llm(key, ANALYSIS_PROMPT)
        .system_prompt(system_prompt)
        .temperature(0.2)
        .build()
}

fn summary() -> Step {
    Step::llm(
        "summary",
        "Please synthesize the following analyses of a contract into a comprehensive summary report.\n\
         Original Contract Text (for reference, if needed, but focus on the analyses):\n\
         --- BEGIN CONTRACT TEXT (abbreviated for prompt, or just mention it was analyzed) ---\n\
         {{input}}...\n\
         --- END CONTRACT TEXT ---\n\
         Legal Terms Analysis:\n{{legal}}\n\
         Compliance Validation:\n{{compliance}}\n\
         Financial Risk Assessment:\n{{financial}}\n\
         Provide a consolidated executive summary identifying key issues and an overall assessment.",
    )
    .system_prompt(
        "You are a senior legal counsel. You have received analyses on a contract from \
         legal terms, compliance, and financial risk specialists. Your task is to synthesize \
         these findings into a single, comprehensive executive summary of the contract's overall \
         status and key concerns.",
    )
    .temperature(0.3)
    .build()
}

/// Build the contract review workflow
pub fn workflow() -> Parallel {
    Parallel::builder()
        .name("contract-review")
        .step(specialist(
            LEGAL,
            "You are a legal expert specializing in contract law. \
             Identify any problematic legal terms or clauses in the following contract text and \
             explain why they may be an issue. You MUST provide specific feedback on each \
             identified term or clause.",
        ))
        .step(specialist(
            COMPLIANCE,
            "You are a compliance expert with deep knowledge of industry regulations and standards. \
             Analyze the following contract text for any potential compliance issues with relevant \
             regulations and industry standards. Provide a detailed report of any identified \
             compliance risks and suggest how to mitigate them.",
        ))
        .step(specialist(
            FINANCIAL,
            "You are a financial expert specializing in risk assessment. \
             Analyze the following contract text for any potential financial risks, \
             liabilities, or obligations that could impact the financial health of the parties involved. \
             Provide a detailed report of any identified financial risks and suggest how to mitigate them.",
        ))
        .default_output(LEGAL, "No legal analysis provided.")
        .default_output(COMPLIANCE, "No compliance analysis provided.")
        .default_output(FINANCIAL, "No financial analysis provided.")
        .synthesis(summary())
        .synthesis_input_limit(SUMMARY_EXCERPT_CHARS)
        .build()
}

/// Analyze `contract` and summarize the findings
pub async fn run(
    contract: &str,
    provider: &dyn LLMProvider,
) -> WorkflowResult<(ParallelOutput, ParallelExecutionTrace)> {
    tracing::info!(chars = contract.chars().count(), "Analyzing contract");
    workflow().execute(contract, provider).await
}
