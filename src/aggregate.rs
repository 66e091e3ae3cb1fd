//! Summary tables behind each chart.
//!
//! Every function here borrows the dataset and returns an owned table.
//! Nothing is written back, so sections can run in any order and any
//! number of times with the same result.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::data::{Dataset, LOCATION_COLUMN, OBSTACLE_COLUMN, REASON_COLUMN};
use crate::error::ChartError;

/// Recognized obstacle phrases, in stacking order.
pub const OBSTACLES: [&str; 5] = [
    "Long queues",
    "Limited food options",
    "Unhealthy food options",
    "Expensive",
    "Other",
];

pub const REASON_DELIMITER: char = ';';

/// Group label used when the location column is absent.
pub const ALL_RESPONDENTS: &str = "All respondents";

/// How an obstacle phrase is looked for in the free-text answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Case-insensitive containment anywhere in the text ("other" matches "mother").
    Substring,
    /// Case-insensitive, phrase must not touch a letter or digit on either side.
    WholeWord,
}

impl MatchMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "substring" | "contains" => Some(MatchMode::Substring),
            "word" | "whole_word" | "whole-word" => Some(MatchMode::WholeWord),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMode::Substring => "substring",
            MatchMode::WholeWord => "whole_word",
        }
    }

    pub fn matches(&self, text: &str, phrase: &str) -> bool {
        let text = text.to_lowercase();
        let phrase = phrase.to_lowercase();
        self.matches_lowered(&text, &phrase)
    }

    fn matches_lowered(&self, text: &str, phrase: &str) -> bool {
        if phrase.is_empty() {
            return false;
        }
        match self {
            MatchMode::Substring => text.contains(phrase),
            MatchMode::WholeWord => contains_bounded(text, phrase),
        }
    }
}

/// How multi-select answers are cut into reason tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenMode {
    /// Tokens exactly as split, surrounding spaces and empty pieces included.
    Raw,
    /// Tokens trimmed, empty pieces dropped.
    Trimmed,
}

impl TokenMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "raw" => Some(TokenMode::Raw),
            "trim" | "trimmed" => Some(TokenMode::Trimmed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenMode::Raw => "raw",
            TokenMode::Trimmed => "trimmed",
        }
    }

    fn tokens<'a>(&self, answer: &'a str) -> Vec<&'a str> {
        let pieces = answer.split(REASON_DELIMITER);
        match self {
            TokenMode::Raw => pieces.collect(),
            TokenMode::Trimmed => pieces.map(str::trim).filter(|t| !t.is_empty()).collect(),
        }
    }
}

fn contains_bounded(haystack: &str, needle: &str) -> bool {
    let mut start = 0;
    while let Some(pos) = haystack[start..].find(needle) {
        let begin = start + pos;
        let end = begin + needle.len();
        let before_ok = haystack[..begin]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        if before_ok && after_ok {
            return true;
        }
        start = begin + haystack[begin..].chars().next().map_or(1, char::len_utf8);
    }
    false
}

/// Frequency table, most frequent first. Ties keep first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValueCounts {
    entries: Vec<(String, usize)>,
}

impl ValueCounts {
    pub fn from_values<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut entries: Vec<(String, usize)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for value in values {
            match positions.get(value) {
                Some(&i) => entries[i].1 += 1,
                None => {
                    positions.insert(value.to_string(), entries.len());
                    entries.push((value.to_string(), 1));
                }
            }
        }
        // stable, so equal counts stay in first-seen order
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        Self { entries }
    }

    pub fn get(&self, value: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|(v, _)| v == value)
            .map(|(_, c)| *c)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, c)| c).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(v, c)| (v.as_str(), *c))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObstacleRow {
    pub location: String,
    pub counts: [usize; OBSTACLES.len()],
}

impl ObstacleRow {
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Obstacle mentions summed per purchase location, locations sorted by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObstacleTable {
    pub obstacles: Vec<String>,
    pub rows: Vec<ObstacleRow>,
}

impl ObstacleTable {
    pub fn row(&self, location: &str) -> Option<&ObstacleRow> {
        self.rows.iter().find(|r| r.location == location)
    }

    pub fn max_total(&self) -> usize {
        self.rows.iter().map(ObstacleRow::total).max().unwrap_or(0)
    }
}

pub fn location_counts(dataset: &Dataset) -> Result<ValueCounts, ChartError> {
    let column = dataset.column(LOCATION_COLUMN)?;
    Ok(ValueCounts::from_values(column.present()))
}

/// Split each multi-select answer on `;` and count every reason once per mention.
pub fn reason_counts(dataset: &Dataset, mode: TokenMode) -> Result<ValueCounts, ChartError> {
    let column = dataset.column(REASON_COLUMN)?;
    let tokens = column.present().flat_map(|answer| mode.tokens(answer));
    Ok(ValueCounts::from_values(tokens))
}

pub fn indicators_for(text: Option<&str>, mode: MatchMode) -> [bool; OBSTACLES.len()] {
    let mut flags = [false; OBSTACLES.len()];
    if let Some(text) = text {
        let lowered = text.to_lowercase();
        for (flag, phrase) in flags.iter_mut().zip(OBSTACLES.iter()) {
            *flag = mode.matches_lowered(&lowered, &phrase.to_lowercase());
        }
    }
    flags
}

/// One indicator row per respondent; a missing answer matches nothing.
pub fn obstacle_indicators(
    dataset: &Dataset,
    mode: MatchMode,
) -> Result<Vec<[bool; OBSTACLES.len()]>, ChartError> {
    let column = dataset.column(OBSTACLE_COLUMN)?;
    Ok(column.values().map(|text| indicators_for(text, mode)).collect())
}

pub fn obstacles_by_location(
    dataset: &Dataset,
    mode: MatchMode,
) -> Result<ObstacleTable, ChartError> {
    let indicators = obstacle_indicators(dataset, mode)?;
    let locations: Vec<Option<&str>> = match dataset.column(LOCATION_COLUMN) {
        Ok(column) => column.values().collect(),
        Err(_) => vec![Some(ALL_RESPONDENTS); indicators.len()],
    };

    let mut groups: BTreeMap<&str, [usize; OBSTACLES.len()]> = BTreeMap::new();
    for (location, flags) in locations.into_iter().zip(indicators.iter()) {
        let Some(location) = location else { continue };
        let sums = groups.entry(location).or_insert([0; OBSTACLES.len()]);
        for (sum, flag) in sums.iter_mut().zip(flags.iter()) {
            *sum += usize::from(*flag);
        }
    }

    Ok(ObstacleTable {
        obstacles: OBSTACLES.iter().map(|s| s.to_string()).collect(),
        rows: groups
            .into_iter()
            .map(|(location, counts)| ObstacleRow {
                location: location.to_string(),
                counts,
            })
            .collect(),
    })
}
