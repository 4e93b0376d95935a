//! The text contract between prompts and parsers.
//!
//! A completion is markdown split into sections. A section starts at a
//! heading line (`#` to `######`), optionally numbered:
//!
//! ```text
//! ## 1. Story Points
//! 5
//!
//! ## Risks:
//! - [high] Third-party SSO outage blocks login
//! - Password rules undefined
//! ```
//!
//! Section titles match case-insensitively, ignoring a trailing colon and
//! surrounding `**`. Text before the first heading is ignored; when a title
//! repeats, the first occurrence wins.
//!
//! A section body is either free text or a list. List entries are lines
//! starting with `-`, `*`, `+`, `1.` or `1)`; other lines in a list section
//! are ignored. Required sections that are absent, empty, or hold an
//! out-of-range number fail with [`PoError::Parse`] naming the section.
//!
//! | result | required sections |
//! |---|---|
//! | story analysis | Story Points (1–100), Risks, Recommendations, Value Score (1–10), Complexity Score (1–10) |
//! | prioritization | Prioritized Items: `N. [<item id>] justification` (or `- [<item id>] ...`) |
//! | sprint performance | Velocity Trend (improving / stable / declining), Quality Metrics (`name: value`), Risk Assessment, Recommendations |
//! | sprint report | Executive Summary, Detailed Analysis (text), Recommendations, Next Steps |
//! | feedback analysis | Patterns, Impact Assessment, Action Items, Risk Assessment |
//! | task breakdown | no headings needed; every list entry is a task |

use std::collections::HashSet;
use std::ops::RangeInclusive;
use std::sync::OnceLock;

use regex::Regex;

use super::{
    FeedbackAnalysis, Prioritization, QualityMetric, RankedItem, Risk, RiskLevel,
    SprintPerformance, SprintReport, StoryAnalysis, VelocityTrend,
};
use crate::entity::{BacklogItem, EntityId};
use crate::error::{PoError, Result};

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

static HEADING_RE: OnceLock<Regex> = OnceLock::new();
static BULLET_RE: OnceLock<Regex> = OnceLock::new();
static NUMBER_RE: OnceLock<Regex> = OnceLock::new();
static RANKED_RE: OnceLock<Regex> = OnceLock::new();
static SEVERITY_RE: OnceLock<Regex> = OnceLock::new();
static TREND_RE: OnceLock<Regex> = OnceLock::new();

fn heading_re() -> &'static Regex {
    HEADING_RE.get_or_init(|| {
        Regex::new(r"^\s{0,3}#{1,6}\s+(?:\d+[.)]\s*)?(.+?)\s*#*\s*$").unwrap()
    })
}

fn bullet_re() -> &'static Regex {
    BULLET_RE.get_or_init(|| Regex::new(r"^\s*(?:[-*+]|\d+[.)])\s+(.+?)\s*$").unwrap())
}

fn number_re() -> &'static Regex {
    NUMBER_RE.get_or_init(|| Regex::new(r"\d+").unwrap())
}

fn ranked_re() -> &'static Regex {
    RANKED_RE.get_or_init(|| {
        Regex::new(r"^\s*(?:[-*+]|\d+[.)])\s+\[#?(\d+)\]\s*(?:[-:\u{2013}\u{2014}]\s*)?(.*?)\s*$").unwrap()
    })
}

fn severity_re() -> &'static Regex {
    SEVERITY_RE.get_or_init(|| Regex::new(r"(?i)^\[(high|medium|low)\]\s*(.*)$").unwrap())
}

fn trend_re() -> &'static Regex {
    TREND_RE.get_or_init(|| Regex::new(r"(?i)\b(improving|stable|declining)\b").unwrap())
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Section {
    key: String,
    lines: Vec<String>,
}

/// A completion split into headed sections.
#[derive(Debug, Clone)]
pub struct Sections {
    sections: Vec<Section>,
}

fn section_key(title: &str) -> String {
    title
        .trim_matches(|c: char| c == '*' || c == ':' || c.is_whitespace())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl Sections {
    pub fn parse(text: &str) -> Self {
        let mut sections: Vec<Section> = Vec::new();
        for line in text.lines() {
            if let Some(caps) = heading_re().captures(line) {
                sections.push(Section {
                    key: section_key(&caps[1]),
                    lines: Vec::new(),
                });
            } else if let Some(current) = sections.last_mut() {
                current.lines.push(line.to_string());
            }
        }
        Self { sections }
    }

    pub fn has(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    fn find(&self, name: &str) -> Option<&Section> {
        let key = section_key(name);
        self.sections.iter().find(|s| s.key == key)
    }

    fn require(&self, name: &str) -> Result<&Section> {
        self.find(name)
            .ok_or_else(|| PoError::parse(name, "section missing"))
    }

    /// Free text of a section, trimmed. Fails when absent or blank.
    pub fn text(&self, name: &str) -> Result<String> {
        let section = self.require(name)?;
        let text = section.lines.join("\n").trim().to_string();
        if text.is_empty() {
            return Err(PoError::parse(name, "section is empty"));
        }
        Ok(text)
    }

    /// List entries of a section. Fails when absent or without entries.
    pub fn list(&self, name: &str) -> Result<Vec<String>> {
        let section = self.require(name)?;
        let items = list_items(section.lines.iter().map(String::as_str));
        if items.is_empty() {
            return Err(PoError::parse(name, "expected at least one list entry"));
        }
        Ok(items)
    }

    /// First integer in a section, checked against `range`.
    pub fn number(&self, name: &str, range: RangeInclusive<u32>) -> Result<u32> {
        let text = self.text(name)?;
        let found = number_re()
            .find(&text)
            .ok_or_else(|| PoError::parse(name, "no number found"))?;
        let value: u32 = found
            .as_str()
            .parse()
            .map_err(|_| PoError::parse(name, format!("'{}' is not a number", found.as_str())))?;
        if !range.contains(&value) {
            return Err(PoError::parse(
                name,
                format!(
                    "{value} is outside {}..={}",
                    range.start(),
                    range.end()
                ),
            ));
        }
        Ok(value)
    }

    fn lines(&self, name: &str) -> Result<&[String]> {
        Ok(self.require(name)?.lines.as_slice())
    }
}

fn list_items<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<String> {
    lines
        .filter_map(|line| bullet_re().captures(line))
        .map(|caps| caps[1].trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn score(sections: &Sections, name: &str) -> Result<u8> {
    // 1..=10 always fits in a u8.
    Ok(sections.number(name, 1..=10)? as u8)
}

// ---------------------------------------------------------------------------
// Result parsers
// ---------------------------------------------------------------------------

pub fn story_analysis(text: &str) -> Result<StoryAnalysis> {
    let sections = Sections::parse(text);
    let story_points = sections.number("Story Points", 1..=100)?;
    let risks = sections
        .list("Risks")?
        .into_iter()
        .map(|entry| parse_risk(&entry))
        .collect();
    let recommendations = sections.list("Recommendations")?;
    let value_score = score(&sections, "Value Score")?;
    let complexity_score = score(&sections, "Complexity Score")?;
    Ok(StoryAnalysis {
        story_points,
        risks,
        recommendations,
        value_score,
        complexity_score,
        raw: text.to_string(),
    })
}

fn parse_risk(entry: &str) -> Risk {
    match severity_re().captures(entry) {
        Some(caps) => {
            let severity = match caps[1].to_ascii_lowercase().as_str() {
                "high" => RiskLevel::High,
                "medium" => RiskLevel::Medium,
                _ => RiskLevel::Low,
            };
            Risk {
                description: caps[2].trim().to_string(),
                severity: Some(severity),
            }
        }
        None => Risk {
            description: entry.to_string(),
            severity: None,
        },
    }
}

/// Parse a ranking of `items`. Every ranked id must belong to `items` and
/// appear once; items the completion left out follow the ranked ones in
/// their original order, without justification.
pub fn prioritization(text: &str, items: &[BacklogItem]) -> Result<Prioritization> {
    const SECTION: &str = "Prioritized Items";
    let sections = Sections::parse(text);
    let known: HashSet<EntityId> = items.iter().map(|i| i.id).collect();

    let mut seen = HashSet::new();
    let mut ordered = Vec::new();
    for line in sections.lines(SECTION)? {
        if bullet_re().captures(line).is_none() {
            continue;
        }
        let caps = ranked_re().captures(line).ok_or_else(|| {
            PoError::parse(SECTION, format!("entry '{}' has no [item id]", line.trim()))
        })?;
        let id: EntityId = caps[1]
            .parse()
            .map_err(|_| PoError::parse(SECTION, format!("bad item id '{}'", &caps[1])))?;
        if !known.contains(&id) {
            return Err(PoError::parse(SECTION, format!("unknown item id {id}")));
        }
        if !seen.insert(id) {
            return Err(PoError::parse(SECTION, format!("item id {id} ranked twice")));
        }
        let justification = caps[2].trim();
        ordered.push(RankedItem {
            item_id: id,
            rank: ordered.len() + 1,
            justification: (!justification.is_empty()).then(|| justification.to_string()),
        });
    }
    if ordered.is_empty() {
        return Err(PoError::parse(SECTION, "no ranked entries"));
    }

    for item in items {
        if !seen.contains(&item.id) {
            ordered.push(RankedItem {
                item_id: item.id,
                rank: ordered.len() + 1,
                justification: None,
            });
        }
    }

    Ok(Prioritization {
        ordered,
        raw: text.to_string(),
    })
}

/// Parse a performance analysis. `velocity` is measured, not parsed.
pub fn sprint_performance(text: &str, velocity: f64) -> Result<SprintPerformance> {
    const TREND: &str = "Velocity Trend";
    const METRICS: &str = "Quality Metrics";
    let sections = Sections::parse(text);

    let trend_text = sections.text(TREND)?;
    let velocity_trend = trend_re()
        .captures(&trend_text)
        .and_then(|caps| caps[1].parse::<VelocityTrend>().ok())
        .ok_or_else(|| PoError::parse(TREND, "expected improving, stable or declining"))?;

    let quality_metrics = sections
        .list(METRICS)?
        .into_iter()
        .map(|entry| match entry.split_once(':') {
            Some((name, value)) if !name.trim().is_empty() && !value.trim().is_empty() => {
                Ok(QualityMetric {
                    name: name.trim().to_string(),
                    value: value.trim().to_string(),
                })
            }
            _ => Err(PoError::parse(
                METRICS,
                format!("entry '{entry}' is not 'name: value'"),
            )),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(SprintPerformance {
        velocity,
        velocity_trend,
        quality_metrics,
        risk_assessment: sections.list("Risk Assessment")?,
        recommendations: sections.list("Recommendations")?,
        raw: text.to_string(),
    })
}

pub fn sprint_report(text: &str) -> Result<SprintReport> {
    let sections = Sections::parse(text);
    Ok(SprintReport {
        executive_summary: sections.text("Executive Summary")?,
        detailed_analysis: sections.text("Detailed Analysis")?,
        recommendations: sections.list("Recommendations")?,
        next_steps: sections.list("Next Steps")?,
        raw: text.to_string(),
    })
}

pub fn feedback_analysis(text: &str) -> Result<FeedbackAnalysis> {
    let sections = Sections::parse(text);
    Ok(FeedbackAnalysis {
        patterns: sections.list("Patterns")?,
        impact_assessment: sections.list("Impact Assessment")?,
        action_items: sections.list("Action Items")?,
        risk_assessment: sections.list("Risk Assessment")?,
        raw: text.to_string(),
    })
}

/// Every list entry in the completion, headings or not.
pub fn task_list(text: &str) -> Result<Vec<String>> {
    let tasks = list_items(text.lines());
    if tasks.is_empty() {
        return Err(PoError::parse("Tasks", "expected at least one list entry"));
    }
    Ok(tasks)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
