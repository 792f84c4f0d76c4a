//! The root-cause analysis signature and its prompt rendering.
//!
//! A signature is the typed contract between the policy and the model:
//! named, described input fields and output fields in a fixed order. The
//! prompt is generated from it, and the parser checks replies against it.

use sentinel_core::decision::{Action, Decision, Severity};
use sentinel_core::message::Message;

use crate::examples::ExampleSet;

/// One named, described slot of a signature.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct Signature {
    pub objective: &'static str,
    pub inputs: &'static [Field],
    /// Reasoning first, so the categorical fields follow from it.
    pub outputs: &'static [Field],
}

pub const ROOT_CAUSE_ANALYSIS: Signature = Signature {
    objective: "Given the raw logs of a container, explain what is going wrong, \
                name the specific technical fault, rate its severity and pick the \
                remediation action.",
    inputs: &[
        Field {
            name: "container_name",
            description: "Name of the service being analyzed",
        },
        Field {
            name: "logs",
            description: "Raw text logs captured from the container",
        },
    ],
    outputs: &[
        Field {
            name: "reasoning",
            description: "Step-by-step analysis of the error stack trace",
        },
        Field {
            name: "root_cause",
            description: "The specific technical fault (e.g., OOMKilled, Segfault)",
        },
        Field {
            name: "severity",
            description: "LOW, MEDIUM, HIGH, or CRITICAL",
        },
        Field {
            name: "suggested_action",
            description: "The exact tool to use: 'restart_service', 'escalate', 'ignore', or 'none'",
        },
    ],
};

impl Signature {
    pub fn output_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.outputs.iter().map(|f| f.name)
    }

    /// The system message: fields, their order, and the output contract.
    pub fn system_prompt(&self) -> String {
        let mut prompt = String::from("Your input fields are:\n");
        for (i, field) in self.inputs.iter().enumerate() {
            prompt.push_str(&format!("{}. `{}`: {}\n", i + 1, field.name, field.description));
        }

        prompt.push_str("\nYour output fields are:\n");
        for (i, field) in self.outputs.iter().enumerate() {
            prompt.push_str(&format!("{}. `{}`: {}\n", i + 1, field.name, field.description));
        }

        let keys: Vec<String> = self.output_names().map(|n| format!("\"{n}\"")).collect();
        prompt.push_str(&format!(
            "\nRespond with a single JSON object and nothing else. It must have exactly the keys {} \
             in that order, each with a string value.\n",
            keys.join(", ")
        ));

        let severities: Vec<&str> = Severity::ALL.iter().map(|s| s.as_str()).collect();
        let actions: Vec<&str> = Action::ALL.iter().map(|a| a.as_str()).collect();
        prompt.push_str(&format!(
            "`severity` must be one of: {}.\n`suggested_action` must be one of: {}.\n",
            severities.join(", "),
            actions.join(", ")
        ));

        prompt.push_str(&format!(
            "\nIn adhering to this structure, your objective is: {}",
            self.objective
        ));
        prompt
    }

    /// Render the input fields of one case as a user turn.
    pub fn render_inputs(&self, container_name: &str, logs: &str) -> String {
        format!("[[ container_name ]]\n{container_name}\n\n[[ logs ]]\n{}", logs.trim_end())
    }

    /// Render a decision the way the model is asked to answer.
    pub fn render_outputs(&self, decision: &Decision) -> String {
        let object = serde_json::json!({
            "reasoning": decision.reasoning,
            "root_cause": decision.root_cause,
            "severity": decision.severity.as_str(),
            "suggested_action": decision.suggested_action.as_str(),
        });
        serde_json::to_string_pretty(&object).unwrap_or_default()
    }

    /// Full conversation for one call: system prompt, each demonstration as
    /// a prior user/assistant exchange, then the case to decide.
    pub fn build_messages(
        &self,
        examples: &ExampleSet,
        container_name: &str,
        logs: &str,
    ) -> Vec<Message> {
        let mut messages = Vec::with_capacity(2 + examples.demonstrations.len() * 2);
        messages.push(Message::system(self.system_prompt()));

        for demo in &examples.demonstrations {
            messages.push(Message::user(self.render_inputs(&demo.workload, &demo.logs)));
            messages.push(Message::assistant(self.render_outputs(&demo.decision)));
        }

        messages.push(Message::user(self.render_inputs(container_name, logs)));
        messages
    }
}
