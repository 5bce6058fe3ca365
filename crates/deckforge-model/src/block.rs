//! Content blocks - the unit of layout decision.
//!
//! A block is one content unit mapped to exactly one output slide. The set of
//! block keys is closed: rendering dispatches by exhaustive `match`, so adding
//! a key is a compile error until every stage handles it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The five synthesis sections blocks are classified from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    /// Regulatory environment and incentives
    Policy,

    /// Market size, demand, and pricing
    Market,

    /// Competitive landscape
    Competitors,

    /// Entry depth: case studies and strategic assessment
    Depth,
}

impl Section {
    /// All sections in classification order
    pub fn all() -> [Section; 4] {
        [
            Section::Policy,
            Section::Market,
            Section::Competitors,
            Section::Depth,
        ]
    }

    /// Display name used on section divider slides
    pub fn divider_title(&self) -> &'static str {
        match self {
            Section::Policy => "Policy & Regulation",
            Section::Market => "Market Fundamentals",
            Section::Competitors => "Competitive Landscape",
            Section::Depth => "Market Entry Assessment",
        }
    }

    /// Section name as it appears in the synthesis input
    pub fn input_key(&self) -> &'static str {
        match self {
            Section::Policy => "policy",
            Section::Market => "market",
            Section::Competitors => "competitors",
            Section::Depth => "depth",
        }
    }
}

/// Closed set of block identifiers.
///
/// Each key owns exactly one renderer and one default [`DataType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockKey {
    // Policy
    FoundationalActs,
    KeyIncentives,
    InvestmentRestrictions,
    // Market
    Tpes,
    FinalDemand,
    Electricity,
    GasLng,
    Pricing,
    EscoMarket,
    // Competitors
    JapanesePlayers,
    LocalMajor,
    ForeignPlayers,
    PartnerAssessment,
    // Depth
    CaseStudy,
    LessonsLearned,
    GoNoGo,
    OpportunitiesObstacles,
    KeyInsights,
    TimingIntelligence,
}

impl BlockKey {
    /// Every key, in deck order
    pub fn all() -> &'static [BlockKey] {
        use BlockKey::*;
        &[
            FoundationalActs,
            KeyIncentives,
            InvestmentRestrictions,
            Tpes,
            FinalDemand,
            Electricity,
            GasLng,
            Pricing,
            EscoMarket,
            JapanesePlayers,
            LocalMajor,
            ForeignPlayers,
            PartnerAssessment,
            CaseStudy,
            LessonsLearned,
            GoNoGo,
            OpportunitiesObstacles,
            KeyInsights,
            TimingIntelligence,
        ]
    }

    /// The camelCase identifier used in synthesis payloads and contracts
    pub fn as_str(&self) -> &'static str {
        use BlockKey::*;
        match self {
            FoundationalActs => "foundationalActs",
            KeyIncentives => "keyIncentives",
            InvestmentRestrictions => "investmentRestrictions",
            Tpes => "tpes",
            FinalDemand => "finalDemand",
            Electricity => "electricity",
            GasLng => "gasLng",
            Pricing => "pricing",
            EscoMarket => "escoMarket",
            JapanesePlayers => "japanesePlayers",
            LocalMajor => "localMajor",
            ForeignPlayers => "foreignPlayers",
            PartnerAssessment => "partnerAssessment",
            CaseStudy => "caseStudy",
            LessonsLearned => "lessonsLearned",
            GoNoGo => "goNoGo",
            OpportunitiesObstacles => "opportunitiesObstacles",
            KeyInsights => "keyInsights",
            TimingIntelligence => "timingIntelligence",
        }
    }

    /// Parse from the camelCase identifier
    pub fn parse(s: &str) -> Option<BlockKey> {
        BlockKey::all().iter().copied().find(|k| k.as_str() == s)
    }

    /// The section this key is classified from
    pub fn section(&self) -> Section {
        use BlockKey::*;
        match self {
            FoundationalActs | KeyIncentives | InvestmentRestrictions => Section::Policy,
            Tpes | FinalDemand | Electricity | GasLng | Pricing | EscoMarket => Section::Market,
            JapanesePlayers | LocalMajor | ForeignPlayers | PartnerAssessment => {
                Section::Competitors
            }
            CaseStudy | LessonsLearned | GoNoGo | OpportunitiesObstacles | KeyInsights
            | TimingIntelligence => Section::Depth,
        }
    }

    /// The semantic shape this key's payload defaults to
    pub fn default_data_type(&self) -> DataType {
        use BlockKey::*;
        match self {
            FoundationalActs | KeyIncentives | InvestmentRestrictions => DataType::RegulationList,
            JapanesePlayers | LocalMajor | ForeignPlayers | PartnerAssessment => {
                DataType::CompanyComparison
            }
            Tpes | FinalDemand | Electricity | GasLng => DataType::TimeSeriesMultiInsight,
            Pricing => DataType::FinancialPerformance,
            EscoMarket => DataType::CompositionBreakdown,
            CaseStudy | LessonsLearned => DataType::CaseStudy,
            GoNoGo | KeyInsights | TimingIntelligence => DataType::SectionSummary,
            OpportunitiesObstacles => DataType::OpportunitiesVsBarriers,
        }
    }

    /// Human-readable slide title when the synthesis supplies none
    pub fn default_title(&self) -> &'static str {
        use BlockKey::*;
        match self {
            FoundationalActs => "Foundational Acts & Regulatory Framework",
            KeyIncentives => "Key Incentive Programs",
            InvestmentRestrictions => "Foreign Investment Restrictions",
            Tpes => "Total Primary Energy Supply",
            FinalDemand => "Final Energy Demand",
            Electricity => "Electricity Market",
            GasLng => "Gas & LNG Market",
            Pricing => "Energy Pricing",
            EscoMarket => "ESCO Market",
            JapanesePlayers => "Japanese Players",
            LocalMajor => "Major Local Players",
            ForeignPlayers => "Foreign Players",
            PartnerAssessment => "Partner Assessment",
            CaseStudy => "Market Entry Case Study",
            LessonsLearned => "Lessons Learned",
            GoNoGo => "Go / No-Go Assessment",
            OpportunitiesObstacles => "Opportunities & Obstacles",
            KeyInsights => "Key Insights",
            TimingIntelligence => "Timing Intelligence",
        }
    }
}

/// Semantic shape tags for block payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    RegulationList,
    CompanyComparison,
    TimeSeriesMultiInsight,
    CompositionBreakdown,
    CaseStudy,
    SectionSummary,
    OpportunitiesVsBarriers,
    FinancialPerformance,
}

/// Research quality tag attached to a block's sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataQuality {
    High,
    Medium,
    Low,
    Estimated,
    #[default]
    Unknown,
}

impl DataQuality {
    /// Parse the loose string forms seen in synthesis payloads
    pub fn parse(s: &str) -> DataQuality {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => DataQuality::High,
            "medium" | "med" => DataQuality::Medium,
            "low" => DataQuality::Low,
            "estimated" | "estimate" => DataQuality::Estimated,
            _ => DataQuality::Unknown,
        }
    }
}

/// Where the router found the slide a block landed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateSource {
    Primary,
    DefaultRoute,
    PrimaryPatternScan,
    DefaultPatternScan,
    GeometryRecovery,
}

impl TemplateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateSource::Primary => "primary",
            TemplateSource::DefaultRoute => "default-route",
            TemplateSource::PrimaryPatternScan => "primary-pattern-scan",
            TemplateSource::DefaultPatternScan => "default-pattern-scan",
            TemplateSource::GeometryRecovery => "geometryRecovery",
        }
    }
}

/// Routing result attached to a block by the template router
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteInfo {
    /// Named pattern in the template contract
    pub pattern: String,

    /// 1-based slide index in the reference template
    pub slide: u32,

    /// How the slide was found
    pub source: TemplateSource,

    /// True when the primary candidate lacked required geometry and an
    /// alternate was substituted
    pub recovered: bool,
}

/// One content unit mapped to exactly one output slide.
///
/// Created by the classifier, routed by the template router, consumed by the
/// renderer. The payload has already been sanitized and normalized; unknown
/// non-template keys are gone by the time a `Block` exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// Identifier from the closed key set
    pub key: BlockKey,

    /// Semantic shape of the payload
    pub data_type: DataType,

    /// Normalized payload
    pub data: Value,

    /// Slide title
    pub title: String,

    /// Optional slide subtitle
    pub subtitle: Option<String>,

    /// Source citations, rendered into the source line
    pub citations: Vec<String>,

    /// Quality of the underlying research
    pub data_quality: DataQuality,

    /// Set by the router; `None` until routing has run
    pub route: Option<RouteInfo>,
}

impl Block {
    /// Create an unrouted block with defaults derived from the key
    pub fn new(key: BlockKey, data: Value) -> Self {
        Self {
            key,
            data_type: key.default_data_type(),
            data,
            title: key.default_title().to_string(),
            subtitle: None,
            citations: Vec::new(),
            data_quality: DataQuality::Unknown,
            route: None,
        }
    }

    /// Set the title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the citations
    pub fn with_citations(mut self, citations: Vec<String>) -> Self {
        self.citations = citations;
        self
    }

    /// Set the data quality
    pub fn with_quality(mut self, quality: DataQuality) -> Self {
        self.data_quality = quality;
        self
    }
}
