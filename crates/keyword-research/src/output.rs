//! Typed keyword research document and its builder.

use std::path::Path;

use chrono::NaiveDate;
use search_core::error::Result;
use search_core::formatting::round_to;
use search_core::time_utils::date_format;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

// ── Vocabularies ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchIntent {
    Informational,
    Navigational,
    Commercial,
    Transactional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeBucket {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    VeryHard,
}

/// Where a keyword's metrics came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    #[default]
    WebSearch,
    Semrush,
    Ahrefs,
    GoogleAds,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerpFeature {
    FeaturedSnippet,
    PeopleAlsoAsk,
    Ads,
    Video,
    Images,
    KnowledgePanel,
    LocalPack,
    Shopping,
    News,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResearchMode {
    #[default]
    Standard,
    TopicalAuthority,
}

// ── Document sections ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub seed_keyword: String,
    pub industry: Option<String>,
    pub target_audience: Option<String>,
    pub geographic_target: Option<String>,
    #[serde(with = "date_format")]
    pub research_date: NaiveDate,
    pub mode: ResearchMode,
    pub data_sources: Vec<DataSource>,
    pub total_keywords: usize,
}

/// One researched keyword.
///
/// `exact_monthly_volume`, `cpc` and `competition_level` are only known when
/// a keyword API enriched the entry; they are omitted from JSON otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordEntry {
    pub keyword: String,
    pub search_intent: SearchIntent,
    pub volume_bucket: VolumeBucket,
    /// Human-readable range, e.g. `"1K-10K"`.
    pub estimated_monthly_volume: String,
    pub difficulty: Difficulty,
    /// 0-100.
    pub difficulty_score: u8,
    pub opportunity_score: f64,
    #[serde(default)]
    pub serp_features: Vec<SerpFeature>,
    pub content_angle: String,
    pub parent_topic: Option<String>,
    #[serde(default)]
    pub source: DataSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact_monthly_volume: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpc: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competition_level: Option<String>,
}

impl KeywordEntry {
    pub fn new(
        keyword: impl Into<String>,
        search_intent: SearchIntent,
        volume_bucket: VolumeBucket,
        difficulty: Difficulty,
    ) -> Self {
        Self {
            keyword: keyword.into(),
            search_intent,
            volume_bucket,
            estimated_monthly_volume: String::new(),
            difficulty,
            difficulty_score: 0,
            opportunity_score: 0.0,
            serp_features: Vec::new(),
            content_angle: String::new(),
            parent_topic: None,
            source: DataSource::default(),
            exact_monthly_volume: None,
            cpc: None,
            competition_level: None,
        }
    }

    pub fn estimated_volume(mut self, estimate: impl Into<String>) -> Self {
        self.estimated_monthly_volume = estimate.into();
        self
    }

    pub fn scores(mut self, difficulty_score: u8, opportunity_score: f64) -> Self {
        self.difficulty_score = difficulty_score;
        self.opportunity_score = opportunity_score;
        self
    }

    pub fn content_angle(mut self, angle: impl Into<String>) -> Self {
        self.content_angle = angle.into();
        self
    }

    pub fn serp_features(mut self, features: Vec<SerpFeature>) -> Self {
        self.serp_features = features;
        self
    }

    pub fn parent_topic(mut self, topic: impl Into<String>) -> Self {
        self.parent_topic = Some(topic.into());
        self
    }

    pub fn source(mut self, source: DataSource) -> Self {
        self.source = source;
        self
    }

    /// Attach metrics from a keyword API.
    pub fn api_metrics(
        mut self,
        exact_monthly_volume: Option<u64>,
        cpc: Option<f64>,
        competition_level: Option<String>,
    ) -> Self {
        self.exact_monthly_volume = exact_monthly_volume;
        self.cpc = cpc;
        self.competition_level = competition_level;
        self
    }
}

/// A "People Also Ask" style question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionEntry {
    pub question: String,
    pub parent_keyword: String,
    pub search_intent: SearchIntent,
    pub opportunity_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentOpportunity {
    pub title: String,
    pub target_keyword: String,
    pub supporting_keywords: Vec<String>,
    pub search_intent: SearchIntent,
    pub estimated_difficulty: Difficulty,
    pub rationale: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompetitiveInsights {
    pub top_competitors: Vec<Value>,
    pub content_gaps: Vec<Value>,
    pub weak_spots: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pillar {
    pub pillar_topic: String,
    pub pillar_keyword: String,
    pub pillar_content_type: String,
    pub volume_bucket: VolumeBucket,
    #[serde(default)]
    pub clusters: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicalAuthority {
    pub pillars: Vec<Pillar>,
    pub content_creation_order: Vec<Value>,
}

/// The full keyword research document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordResearch {
    pub meta: Meta,
    pub keywords: Vec<KeywordEntry>,
    pub questions: Vec<QuestionEntry>,
    pub content_opportunities: Vec<ContentOpportunity>,
    pub competitive_insights: CompetitiveInsights,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topical_authority: Option<TopicalAuthority>,
}

// ── Builder ───────────────────────────────────────────────────────────────────

/// Builder for a [`KeywordResearch`] document.
#[derive(Debug, Clone)]
pub struct KeywordResearchOutput {
    data: KeywordResearch,
}

impl KeywordResearchOutput {
    /// Start a document for `seed_keyword`, dated today.
    ///
    /// Topical-authority mode starts with an empty `topical_authority`
    /// section.
    pub fn new(seed_keyword: impl Into<String>, mode: ResearchMode) -> Self {
        let topical_authority =
            (mode == ResearchMode::TopicalAuthority).then(TopicalAuthority::default);
        Self {
            data: KeywordResearch {
                meta: Meta {
                    seed_keyword: seed_keyword.into(),
                    industry: None,
                    target_audience: None,
                    geographic_target: None,
                    research_date: chrono::Local::now().date_naive(),
                    mode,
                    data_sources: vec![DataSource::WebSearch],
                    total_keywords: 0,
                },
                keywords: Vec::new(),
                questions: Vec::new(),
                content_opportunities: Vec::new(),
                competitive_insights: CompetitiveInsights::default(),
                topical_authority,
            },
        }
    }

    pub fn industry(mut self, industry: impl Into<String>) -> Self {
        self.data.meta.industry = Some(industry.into());
        self
    }

    pub fn target_audience(mut self, audience: impl Into<String>) -> Self {
        self.data.meta.target_audience = Some(audience.into());
        self
    }

    pub fn geographic_target(mut self, target: impl Into<String>) -> Self {
        self.data.meta.geographic_target = Some(target.into());
        self
    }

    /// Replace the data sources; an empty list keeps the `web_search` default.
    pub fn data_sources(mut self, sources: Vec<DataSource>) -> Self {
        if !sources.is_empty() {
            self.data.meta.data_sources = sources;
        }
        self
    }

    pub fn research_date(mut self, date: NaiveDate) -> Self {
        self.data.meta.research_date = date;
        self
    }

    /// Add a keyword; the opportunity score is rounded to one decimal.
    pub fn add_keyword(&mut self, mut entry: KeywordEntry) {
        entry.opportunity_score = round_to(entry.opportunity_score, 1);
        self.data.keywords.push(entry);
        self.data.meta.total_keywords = self.data.keywords.len();
    }

    pub fn add_question(
        &mut self,
        question: impl Into<String>,
        parent_keyword: impl Into<String>,
        opportunity_score: f64,
        search_intent: SearchIntent,
    ) {
        self.data.questions.push(QuestionEntry {
            question: question.into(),
            parent_keyword: parent_keyword.into(),
            search_intent,
            opportunity_score: round_to(opportunity_score, 1),
        });
    }

    pub fn add_content_opportunity(&mut self, opportunity: ContentOpportunity) {
        self.data.content_opportunities.push(opportunity);
    }

    pub fn set_competitive_insights(&mut self, insights: CompetitiveInsights) {
        self.data.competitive_insights = insights;
    }

    /// Add a pillar topic, creating the topical-authority section if needed.
    pub fn add_pillar(&mut self, pillar: Pillar) {
        self.topical_authority_mut().pillars.push(pillar);
    }

    pub fn set_content_creation_order(&mut self, steps: Vec<Value>) {
        self.topical_authority_mut().content_creation_order = steps;
    }

    fn topical_authority_mut(&mut self) -> &mut TopicalAuthority {
        self.data
            .topical_authority
            .get_or_insert_with(TopicalAuthority::default)
    }

    pub fn document(&self) -> &KeywordResearch {
        &self.data
    }

    pub fn into_document(self) -> KeywordResearch {
        self.data
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.data)?)
    }

    /// Write the document to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        info!(
            "Saved keyword research to {}: {} keywords, {} questions, {} content opportunities",
            path.display(),
            self.data.meta.total_keywords,
            self.data.questions.len(),
            self.data.content_opportunities.len()
        );
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample_keyword() -> KeywordEntry {
        KeywordEntry::new(
            "email marketing automation",
            SearchIntent::Informational,
            VolumeBucket::High,
            Difficulty::Medium,
        )
        .estimated_volume("1K-10K")
        .scores(45, 7.26)
        .content_angle("Complete guide")
    }

    #[test]
    fn test_new_standard_document() {
        let out = KeywordResearchOutput::new("email marketing", ResearchMode::Standard);
        let doc = out.document();
        assert_eq!(doc.meta.seed_keyword, "email marketing");
        assert_eq!(doc.meta.data_sources, vec![DataSource::WebSearch]);
        assert_eq!(doc.meta.total_keywords, 0);
        assert!(doc.topical_authority.is_none());
    }

    #[test]
    fn test_topical_authority_mode_starts_section() {
        let out = KeywordResearchOutput::new("crm", ResearchMode::TopicalAuthority);
        assert_eq!(
            out.document().topical_authority,
            Some(TopicalAuthority::default())
        );
        let json: Value = serde_json::from_str(&out.to_json().unwrap()).unwrap();
        assert_eq!(json["meta"]["mode"], "topical-authority");
        assert_eq!(json["topical_authority"]["pillars"], json!([]));
    }

    #[test]
    fn test_add_keyword_rounds_and_counts() {
        let mut out = KeywordResearchOutput::new("email marketing", ResearchMode::Standard);
        out.add_keyword(sample_keyword());
        out.add_keyword(sample_keyword().parent_topic("email"));

        let doc = out.document();
        assert_eq!(doc.meta.total_keywords, 2);
        assert_eq!(doc.keywords[0].opportunity_score, 7.3);
        assert_eq!(doc.keywords[1].parent_topic.as_deref(), Some("email"));
    }

    #[test]
    fn test_optional_api_fields_present_only_when_set() {
        let mut out = KeywordResearchOutput::new("seo", ResearchMode::Standard);
        out.add_keyword(sample_keyword());
        out.add_keyword(
            sample_keyword()
                .source(DataSource::Semrush)
                .api_metrics(Some(5400), Some(3.2), None),
        );

        let json: Value = serde_json::from_str(&out.to_json().unwrap()).unwrap();
        let plain = json["keywords"][0].as_object().unwrap();
        assert!(!plain.contains_key("exact_monthly_volume"));
        assert!(!plain.contains_key("cpc"));
        assert!(plain["parent_topic"].is_null());
        assert_eq!(plain["source"], "web_search");

        let enriched = json["keywords"][1].as_object().unwrap();
        assert_eq!(enriched["exact_monthly_volume"], 5400);
        assert_eq!(enriched["cpc"], 3.2);
        assert!(!enriched.contains_key("competition_level"));
        assert_eq!(enriched["source"], "semrush");
    }

    #[test]
    fn test_add_pillar_creates_section_in_standard_mode() {
        let mut out = KeywordResearchOutput::new("crm", ResearchMode::Standard);
        out.add_pillar(Pillar {
            pillar_topic: "CRM basics".to_string(),
            pillar_keyword: "what is crm".to_string(),
            pillar_content_type: "guide".to_string(),
            volume_bucket: VolumeBucket::VeryHigh,
            clusters: vec![json!({"cluster_topic": "crm for startups"})],
        });
        out.set_content_creation_order(vec![json!("CRM basics")]);

        let ta = out.document().topical_authority.as_ref().unwrap();
        assert_eq!(ta.pillars.len(), 1);
        assert_eq!(ta.content_creation_order, vec![json!("CRM basics")]);
    }

    #[test]
    fn test_meta_setters_and_questions() {
        let mut out = KeywordResearchOutput::new("crm", ResearchMode::Standard)
            .industry("SaaS")
            .target_audience("founders")
            .geographic_target("US")
            .data_sources(vec![DataSource::Ahrefs, DataSource::WebSearch])
            .research_date(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        out.add_question("What is a CRM?", "crm", 8.04, SearchIntent::Informational);

        let json: Value = serde_json::from_str(&out.to_json().unwrap()).unwrap();
        assert_eq!(json["meta"]["industry"], "SaaS");
        assert_eq!(json["meta"]["research_date"], "2025-06-01");
        assert_eq!(json["meta"]["data_sources"], json!(["ahrefs", "web_search"]));
        assert_eq!(json["questions"][0]["opportunity_score"], 8.0);
    }

    #[test]
    fn test_save_and_reload() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out").join("keyword-research.json");
        let mut out = KeywordResearchOutput::new("seo", ResearchMode::Standard);
        out.add_keyword(sample_keyword());
        out.add_content_opportunity(ContentOpportunity {
            title: "Guide".to_string(),
            target_keyword: "seo".to_string(),
            supporting_keywords: vec!["seo tips".to_string()],
            search_intent: SearchIntent::Commercial,
            estimated_difficulty: Difficulty::Hard,
            rationale: "gap".to_string(),
        });
        out.save(&path).unwrap();

        let loaded: KeywordResearch =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(&loaded, out.document());
    }
}
