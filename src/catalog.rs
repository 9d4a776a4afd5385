use serde::{Deserialize, Serialize};

use crate::error::AssessmentError;

// The four screening instruments offered on the test page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestKind {
    Phq9,
    Gad7,
    Pss10,
    Sleep,
}

impl TestKind {
    pub const ALL: [TestKind; 4] = [
        TestKind::Phq9,
        TestKind::Gad7,
        TestKind::Pss10,
        TestKind::Sleep,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TestKind::Phq9 => "phq9",
            TestKind::Gad7 => "gad7",
            TestKind::Pss10 => "pss10",
            TestKind::Sleep => "sleep",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "").as_str() {
            "phq9" => Some(TestKind::Phq9),
            "gad7" => Some(TestKind::Gad7),
            "pss10" => Some(TestKind::Pss10),
            "sleep" => Some(TestKind::Sleep),
            _ => None,
        }
    }

    /// Like [`TestKind::from_str`], but reports the unknown key as an error.
    pub fn parse(s: &str) -> Result<Self, AssessmentError> {
        Self::from_str(s).ok_or_else(|| AssessmentError::UnknownTestKind(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub value: u32,
    pub label: String,
}

impl AnswerOption {
    fn new(value: u32, label: &str) -> Self {
        Self {
            value,
            label: label.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRange {
    pub min: u32,
    pub max: u32,
    pub category: String,
    pub severity_class: String,
    pub description: String,
}

impl ScoreRange {
    fn new(min: u32, max: u32, category: &str, severity_class: &str, description: &str) -> Self {
        Self {
            min,
            max,
            category: category.to_string(),
            severity_class: severity_class.to_string(),
            description: description.to_string(),
        }
    }

    pub fn contains(&self, score: u32) -> bool {
        self.min <= score && score <= self.max
    }
}

/// Maps a total score to its range.
///
/// Scans in ascending order and returns the first range containing `score`,
/// falling back to the last range when nothing matches. Shared by the engine
/// and the profile viewer so both always agree on a category.
///
/// # Panics
///
/// Panics if `ranges` is empty; every catalog definition carries at least one.
pub fn categorize(ranges: &[ScoreRange], score: u32) -> &ScoreRange {
    ranges
        .iter()
        .find(|r| r.contains(score))
        .or_else(|| ranges.last())
        .expect("scoring ranges must not be empty")
}

/// Inverts a raw answer for a reverse-phrased question.
pub fn reverse_score(raw: u32, option_count: usize) -> u32 {
    (option_count as u32).saturating_sub(1).saturating_sub(raw)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDefinition {
    pub kind: TestKind,
    /// Short name persisted as `testName` (e.g. "PHQ-9").
    pub test_name: String,
    pub title: String,
    pub questions: Vec<String>,
    pub options: Vec<AnswerOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_question_options: Option<Vec<AnswerOption>>,
    #[serde(default)]
    pub reverse_scored: Vec<usize>,
    pub max_score: u32,
    pub scoring_ranges: Vec<ScoreRange>,
}

impl TestDefinition {
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn last_index(&self) -> usize {
        self.questions.len().saturating_sub(1)
    }

    pub fn options_for(&self, index: usize) -> &[AnswerOption] {
        match &self.last_question_options {
            Some(last) if index == self.last_index() => last,
            _ => &self.options,
        }
    }

    pub fn is_reverse_scored(&self, index: usize) -> bool {
        self.reverse_scored.contains(&index)
    }

    /// Value that counts toward the total for a raw answer at `index`.
    pub fn adjusted_value(&self, index: usize, raw: u32) -> u32 {
        if self.is_reverse_scored(index) {
            reverse_score(raw, self.options_for(index).len())
        } else {
            raw
        }
    }

    /// Sums adjusted answers in question order. `responses` must hold one
    /// raw value per question.
    pub fn total_score(&self, responses: &[u32]) -> u32 {
        responses
            .iter()
            .enumerate()
            .map(|(i, &raw)| self.adjusted_value(i, raw))
            .sum()
    }

    pub fn categorize(&self, score: u32) -> &ScoreRange {
        categorize(&self.scoring_ranges, score)
    }

    /// Checks that the scoring ranges tile `[0, max_score]` and that the
    /// reverse-scored indices point at real questions.
    pub fn validate(&self) -> Result<(), String> {
        if self.questions.is_empty() {
            return Err(format!("{}: no questions", self.test_name));
        }
        if self.options.is_empty() {
            return Err(format!("{}: no answer options", self.test_name));
        }
        if matches!(&self.last_question_options, Some(last) if last.is_empty()) {
            return Err(format!("{}: no answer options for the last question", self.test_name));
        }
        if let Some(&idx) = self
            .reverse_scored
            .iter()
            .find(|&&i| i >= self.questions.len())
        {
            return Err(format!(
                "{}: reverse-scored index {} out of bounds",
                self.test_name, idx
            ));
        }

        let mut expected_min = 0;
        for range in &self.scoring_ranges {
            if range.min != expected_min || range.max < range.min {
                return Err(format!(
                    "{}: range {}-{} breaks contiguity (expected start {})",
                    self.test_name, range.min, range.max, expected_min
                ));
            }
            expected_min = range.max + 1;
        }
        match self.scoring_ranges.last() {
            Some(last) if last.max == self.max_score => Ok(()),
            Some(last) => Err(format!(
                "{}: ranges end at {} but max score is {}",
                self.test_name, last.max, self.max_score
            )),
            None => Err(format!("{}: no scoring ranges", self.test_name)),
        }
    }
}

/// Immutable table of test definitions handed to the engine at construction.
#[derive(Debug, Clone)]
pub struct Catalog {
    definitions: Vec<TestDefinition>,
}

impl Catalog {
    pub fn new(definitions: Vec<TestDefinition>) -> Self {
        Self { definitions }
    }

    pub fn builtin() -> Self {
        Self::new(vec![phq9(), gad7(), pss10(), sleep()])
    }

    pub fn get(&self, kind: TestKind) -> Result<&TestDefinition, AssessmentError> {
        self.definitions
            .iter()
            .find(|d| d.kind == kind)
            .ok_or_else(|| AssessmentError::UnknownTestKind(kind.as_str().to_string()))
    }

    pub fn by_test_name(&self, test_name: &str) -> Option<&TestDefinition> {
        self.definitions.iter().find(|d| d.test_name == test_name)
    }

    pub fn definitions(&self) -> &[TestDefinition] {
        &self.definitions
    }

    /// Validates every definition and checks each kind is offered once.
    pub fn validate(&self) -> Result<(), String> {
        for def in &self.definitions {
            def.validate()?;
        }
        for kind in TestKind::ALL {
            match self.definitions.iter().filter(|d| d.kind == kind).count() {
                1 => {}
                0 => return Err(format!("no definition for {}", kind.as_str())),
                n => return Err(format!("{} defined {} times", kind.as_str(), n)),
            }
        }
        Ok(())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn frequency_options() -> Vec<AnswerOption> {
    vec![
        AnswerOption::new(0, "Not at all"),
        AnswerOption::new(1, "Several days"),
        AnswerOption::new(2, "More than half the days"),
        AnswerOption::new(3, "Nearly every day"),
    ]
}

fn phq9() -> TestDefinition {
    TestDefinition {
        kind: TestKind::Phq9,
        test_name: "PHQ-9".to_string(),
        title: "PHQ-9 (Depression)".to_string(),
        questions: strings(&[
            "Little interest or pleasure in doing things",
            "Feeling down, depressed, or hopeless",
            "Trouble falling or staying asleep, or sleeping too much",
            "Feeling tired or having little energy",
            "Poor appetite or overeating",
            "Feeling bad about yourself, or that you are a failure or have let yourself or your family down",
            "Trouble concentrating on things, such as reading or watching television",
            "Moving or speaking so slowly that other people could have noticed, or being so fidgety or restless that you have been moving around a lot more than usual",
            "Thoughts that you would be better off dead, or of hurting yourself in some way",
        ]),
        options: frequency_options(),
        last_question_options: None,
        reverse_scored: vec![],
        max_score: 27,
        scoring_ranges: vec![
            ScoreRange::new(0, 4, "Minimal Depression", "minimal",
                "Your responses suggest minimal depressive symptoms. Keep looking after your wellbeing."),
            ScoreRange::new(5, 9, "Mild Depression", "mild",
                "Your responses suggest mild depressive symptoms. Consider monitoring how you feel and talking to someone you trust."),
            ScoreRange::new(10, 14, "Moderate Depression", "moderate",
                "Your responses suggest moderate depressive symptoms. Speaking with a counselor is recommended."),
            ScoreRange::new(15, 19, "Moderately Severe Depression", "moderately-severe",
                "Your responses suggest moderately severe depressive symptoms. Please reach out to a mental health professional."),
            ScoreRange::new(20, 27, "Severe Depression", "severe",
                "Your responses suggest severe depressive symptoms. Please contact a mental health professional as soon as possible."),
        ],
    }
}

fn gad7() -> TestDefinition {
    TestDefinition {
        kind: TestKind::Gad7,
        test_name: "GAD-7".to_string(),
        title: "GAD-7 (Anxiety)".to_string(),
        questions: strings(&[
            "Feeling nervous, anxious, or on edge",
            "Not being able to stop or control worrying",
            "Worrying too much about different things",
            "Trouble relaxing",
            "Being so restless that it is hard to sit still",
            "Becoming easily annoyed or irritable",
            "Feeling afraid, as if something awful might happen",
        ]),
        options: frequency_options(),
        last_question_options: None,
        reverse_scored: vec![],
        max_score: 21,
        scoring_ranges: vec![
            ScoreRange::new(0, 4, "Minimal Anxiety", "minimal",
                "Your responses suggest minimal anxiety."),
            ScoreRange::new(5, 9, "Mild Anxiety", "mild",
                "Your responses suggest mild anxiety. Relaxation and breathing exercises may help."),
            ScoreRange::new(10, 14, "Moderate Anxiety", "moderate",
                "Your responses suggest moderate anxiety. Speaking with a counselor is recommended."),
            ScoreRange::new(15, 21, "Severe Anxiety", "severe",
                "Your responses suggest severe anxiety. Please reach out to a mental health professional."),
        ],
    }
}

fn pss10() -> TestDefinition {
    TestDefinition {
        kind: TestKind::Pss10,
        test_name: "PSS-10".to_string(),
        title: "PSS-10 (Stress)".to_string(),
        questions: strings(&[
            "In the last month, how often have you been upset because of something that happened unexpectedly?",
            "In the last month, how often have you felt that you were unable to control the important things in your life?",
            "In the last month, how often have you felt nervous and stressed?",
            "In the last month, how often have you felt confident about your ability to handle your personal problems?",
            "In the last month, how often have you felt that things were going your way?",
            "In the last month, how often have you found that you could not cope with all the things that you had to do?",
            "In the last month, how often have you been able to control irritations in your life?",
            "In the last month, how often have you felt that you were on top of things?",
            "In the last month, how often have you been angered because of things that happened that were outside of your control?",
            "In the last month, how often have you felt difficulties were piling up so high that you could not overcome them?",
        ]),
        options: vec![
            AnswerOption::new(0, "Never"),
            AnswerOption::new(1, "Almost never"),
            AnswerOption::new(2, "Sometimes"),
            AnswerOption::new(3, "Fairly often"),
            AnswerOption::new(4, "Very often"),
        ],
        last_question_options: None,
        reverse_scored: vec![3, 4, 6, 7],
        max_score: 40,
        scoring_ranges: vec![
            ScoreRange::new(0, 13, "Low Stress", "minimal",
                "Your perceived stress is low."),
            ScoreRange::new(14, 26, "Moderate Stress", "moderate",
                "Your perceived stress is moderate. Regular breaks, sleep and exercise can help."),
            ScoreRange::new(27, 40, "High Stress", "severe",
                "Your perceived stress is high. Consider talking to a counselor about stress management."),
        ],
    }
}

fn sleep() -> TestDefinition {
    TestDefinition {
        kind: TestKind::Sleep,
        test_name: "Sleep Quality Test".to_string(),
        title: "Sleep Quality Test".to_string(),
        questions: strings(&[
            "During the past month, how often have you had trouble falling asleep within 30 minutes?",
            "During the past month, how often have you woken up in the middle of the night or early morning?",
            "During the past month, how often have you had trouble staying awake during class, meals or social activities?",
            "During the past month, how often have you felt too tired to keep up enthusiasm to get things done?",
            "During the past month, how would you rate your sleep quality overall?",
        ]),
        options: vec![
            AnswerOption::new(0, "Not during the past month"),
            AnswerOption::new(1, "Less than once a week"),
            AnswerOption::new(2, "Once or twice a week"),
            AnswerOption::new(3, "Three or more times a week"),
        ],
        last_question_options: Some(vec![
            AnswerOption::new(0, "Very good"),
            AnswerOption::new(1, "Fairly good"),
            AnswerOption::new(2, "Fairly bad"),
            AnswerOption::new(3, "Very bad"),
        ]),
        reverse_scored: vec![],
        max_score: 15,
        scoring_ranges: vec![
            ScoreRange::new(0, 5, "Good Sleep Quality", "minimal",
                "Your sleep quality appears good."),
            ScoreRange::new(6, 10, "Poor Sleep Quality", "moderate",
                "Your sleep quality could be improved. A consistent sleep schedule may help."),
            ScoreRange::new(11, 15, "Very Poor Sleep Quality", "severe",
                "Your sleep quality appears very poor. Consider speaking with a health professional."),
        ],
    }
}
