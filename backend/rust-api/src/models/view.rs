use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A client view that can host live readiness values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    Dashboard,
    Report,
    Quiz,
    Schedule,
    Programming,
}

/// A place on a page that displays one derived value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DisplaySlot {
    ReadinessScore,
    TaskStats,
    TaskProgress,
    PracticeTotals,
}

impl Page {
    /// The slots this page renders. Values for other slots are never sent to it.
    pub fn slots(&self) -> &'static [DisplaySlot] {
        match self {
            Page::Dashboard => &[
                DisplaySlot::ReadinessScore,
                DisplaySlot::TaskStats,
                DisplaySlot::TaskProgress,
                DisplaySlot::PracticeTotals,
            ],
            Page::Report => &[DisplaySlot::ReadinessScore],
            Page::Quiz => &[],
            Page::Schedule => &[DisplaySlot::TaskStats, DisplaySlot::TaskProgress],
            Page::Programming => &[DisplaySlot::PracticeTotals],
        }
    }
}

impl FromStr for Page {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dashboard" => Ok(Page::Dashboard),
            "report" => Ok(Page::Report),
            "quiz" => Ok(Page::Quiz),
            "schedule" => Ok(Page::Schedule),
            "programming" => Ok(Page::Programming),
            other => Err(format!("Unknown page: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessBand {
    Strong,
    Moderate,
    Weak,
}

impl ReadinessBand {
    pub fn from_score(score: u8) -> Self {
        if score >= 70 {
            ReadinessBand::Strong
        } else if score >= 40 {
            ReadinessBand::Moderate
        } else {
            ReadinessBand::Weak
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadinessDisplay {
    pub score: u8,
    pub band: ReadinessBand,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskStatsDisplay {
    pub completed: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PracticeTotalsDisplay {
    pub total: u32,
    pub easy: u32,
    pub medium: u32,
    pub hard: u32,
}

/// Values for the slots a page declared; everything else stays `None`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewUpdate {
    pub page: Page,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readiness: Option<ReadinessDisplay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_stats: Option<TaskStatsDisplay>,
    /// Today's completion percentage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub practice_totals: Option<PracticeTotalsDisplay>,
}

impl ViewUpdate {
    pub fn empty(page: Page) -> Self {
        Self {
            page,
            readiness: None,
            task_stats: None,
            task_progress: None,
            practice_totals: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.readiness.is_none()
            && self.task_stats.is_none()
            && self.task_progress.is_none()
            && self.practice_totals.is_none()
    }
}
