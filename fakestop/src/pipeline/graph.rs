use serde::Serialize;

use super::stage::AnalystStage;

pub const INVESTIGATION: &str = "investigation";
pub const CLASSIFICATION: &str = "classification";

pub const COLLECTOR_STAGE: &str = "collector";
pub const LINGUISTIC_STAGE: &str = "linguistic";
pub const FACT_CHECK_STAGE: &str = "fact_check";
pub const CLASSIFICATION_STAGE: &str = "classification";

/// How the stages of a graph are scheduled. Only sequential runs exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Process {
    #[default]
    Sequential,
}

/// Ordered list of analysts executed one after another.
///
/// A stage may only look one step back: if it consumes upstream context, it gets the
/// output of the stage declared immediately before it.
#[derive(Debug, Clone, Serialize)]
pub struct TaskGraph {
    name: String,
    process: Process,
    stages: Vec<AnalystStage>,
}

impl TaskGraph {
    pub fn sequential(name: impl Into<String>, stages: Vec<AnalystStage>) -> Self {
        Self {
            name: name.into(),
            process: Process::Sequential,
            stages,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn process(&self) -> Process {
        self.process
    }

    pub fn stages(&self) -> &[AnalystStage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Collector -> linguist -> fact-checker. Each later stage reads its predecessor's output.
pub fn investigation_graph(temperature: Option<f32>) -> TaskGraph {
    let collector = AnalystStage::new(
        COLLECTOR_STAGE,
        "Collector Agent",
        "Find and present news stories similar to the one provided",
        "Collect news stories similar to the following article:\n\n{document}",
    )
    .with_backstory("Specialist in retrieving similar texts from the web and from historical archives.")
    .with_expected_output("A list of summaries of similar news stories that were found.")
    .with_temperature(temperature);

    let linguist = AnalystStage::new(
        LINGUISTIC_STAGE,
        "Linguistic Agent",
        "Assess the tone, style and structure of the article",
        "Analyse the tone, style and structure of the following article:\n\n{document}",
    )
    .with_backstory("Expert in linguistic analysis and in detecting rhetorical patterns.")
    .with_expected_output(
        "A report describing the tone (neutral, sensationalist, alarmist, ...), \
         the writing style and the linguistic patterns detected.",
    )
    .consuming_upstream()
    .with_temperature(temperature);

    let fact_checker = AnalystStage::new(
        FACT_CHECK_STAGE,
        "Fact-Checking Agent",
        "Compare the article's claims with verifiable, reliable data",
        "Compare the following article with real facts and trustworthy databases:\n\n{document}",
    )
    .with_backstory("Professional fact-checker with access to many verified sources.")
    .with_expected_output(
        "A detailed check of the article's main points, flagging inconsistencies or false claims.",
    )
    .consuming_upstream()
    .with_temperature(temperature);

    TaskGraph::sequential(INVESTIGATION, vec![collector, linguist, fact_checker])
}

/// Single classifier stage.
///
/// With `uses_findings` the stage consumes upstream context, so a run seeded with the
/// investigation findings classifies on top of them; otherwise it judges the raw article.
pub fn classification_graph(temperature: Option<f32>, uses_findings: bool) -> TaskGraph {
    let mut classifier = AnalystStage::new(
        CLASSIFICATION_STAGE,
        "Classifier Agent",
        "Decide whether the article is reliable, dubious or false, with a justification",
        "Based on the previous analyses, classify the following article:\n\n{document}",
    )
    .with_backstory("Final analyst responsible for classifying the article using the other agents' work.")
    .with_expected_output("Final classification: Reliable, Dubious or False, with a justification.")
    .with_temperature(temperature);

    if uses_findings {
        classifier = classifier.consuming_upstream();
    }

    TaskGraph::sequential(CLASSIFICATION, vec![classifier])
}
