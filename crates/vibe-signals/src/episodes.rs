//! Gap-based segmentation of commit activity and the timing statistics
//! derived from it. Calendar quantities use each commit's own UTC offset,
//! so a developer's local day and hour are what count.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use time::{Date, Duration, OffsetDateTime, Weekday};
use vibe_core::stats::{mean, percentile, round_to, std_dev};
use vibe_core::CommitEvent;

/// A burst of commits whose consecutive gaps stay within the threshold.
/// Derived on every analysis, never stored on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end: OffsetDateTime,
    pub commit_count: usize,
    pub span_minutes: i64,
}

impl Episode {
    fn open(at: OffsetDateTime) -> Self {
        Self {
            start: at,
            end: at,
            commit_count: 1,
            span_minutes: 0,
        }
    }

    fn extend(&mut self, at: OffsetDateTime) {
        self.end = at;
        self.commit_count += 1;
        self.span_minutes = (self.end - self.start).whole_minutes();
    }
}

fn sorted_times(commits: &[CommitEvent]) -> Vec<OffsetDateTime> {
    let mut times: Vec<OffsetDateTime> = commits.iter().map(|c| c.committer_date).collect();
    times.sort();
    times
}

fn segment_times(times: &[OffsetDateTime], gap: Duration) -> Vec<Episode> {
    let mut episodes: Vec<Episode> = Vec::new();
    for &at in times {
        match episodes.last_mut() {
            Some(current) if at - current.end <= gap => current.extend(at),
            _ => episodes.push(Episode::open(at)),
        }
    }
    episodes
}

/// Split commits into episodes. A new episode starts whenever the gap to the
/// previous commit (by committer date) exceeds `gap`.
pub fn segment_episodes(commits: &[CommitEvent], gap: Duration) -> Vec<Episode> {
    segment_times(&sorted_times(commits), gap)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayWindow {
    /// 05:00–11:59
    Morning,
    /// 12:00–16:59
    Afternoon,
    /// 17:00–21:59
    Evening,
    /// 22:00–04:59
    Night,
}

impl DayWindow {
    const ALL: [DayWindow; 4] = [
        DayWindow::Morning,
        DayWindow::Afternoon,
        DayWindow::Evening,
        DayWindow::Night,
    ];

    pub fn from_hour(hour: u8) -> Self {
        match hour {
            5..=11 => DayWindow::Morning,
            12..=16 => DayWindow::Afternoon,
            17..=21 => DayWindow::Evening,
            _ => DayWindow::Night,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    pub days: u32,
    /// `YYYY-MM-DD`
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingStats {
    pub commit_count: usize,
    pub episode_count: usize,
    pub mean_episode_commits: f64,
    pub active_days: usize,
    /// Days from first to last active day, inclusive.
    pub calendar_span_days: i64,
    pub longest_streak: Option<Streak>,
    pub peak_weekday: Option<String>,
    pub peak_window: Option<DayWindow>,
    /// Goh–Barabási burstiness over inter-commit gaps, in -1..=1.
    /// Higher means clumpier activity; 0 when there are fewer than two gaps.
    pub burstiness: f64,
    pub gap_p50_hours: Option<f64>,
    pub gap_p90_hours: Option<f64>,
}

impl TimingStats {
    fn empty() -> Self {
        Self {
            commit_count: 0,
            episode_count: 0,
            mean_episode_commits: 0.0,
            active_days: 0,
            calendar_span_days: 0,
            longest_streak: None,
            peak_weekday: None,
            peak_window: None,
            burstiness: 0.0,
            gap_p50_hours: None,
            gap_p90_hours: None,
        }
    }
}

/// Timing statistics for one commit set.
///
/// `episode_gap` segments episodes (counts and sizes); `streak_gap` groups
/// work sessions for the active-day and streak calculation, so a session
/// running past midnight keeps a streak alive.
pub fn timing_stats(
    commits: &[CommitEvent],
    episode_gap: Duration,
    streak_gap: Duration,
) -> TimingStats {
    let times = sorted_times(commits);
    if times.is_empty() {
        return TimingStats::empty();
    }

    let episodes = segment_times(&times, episode_gap);
    let sizes: Vec<f64> = episodes.iter().map(|e| e.commit_count as f64).collect();

    let days = active_days(&times, streak_gap);
    let calendar_span_days = match (days.first(), days.last()) {
        (Some(first), Some(last)) => (*last - *first).whole_days() + 1,
        _ => 0,
    };

    let gaps: Vec<f64> = times
        .windows(2)
        .map(|w| (w[1] - w[0]).as_seconds_f64() / 3600.0)
        .collect();

    TimingStats {
        commit_count: times.len(),
        episode_count: episodes.len(),
        mean_episode_commits: round_to(mean(&sizes).unwrap_or(0.0), 2),
        active_days: days.len(),
        calendar_span_days,
        longest_streak: longest_streak(&days),
        peak_weekday: peak_weekday(&times).map(|w| w.to_string().to_lowercase()),
        peak_window: peak_window(&times),
        burstiness: round_to(burstiness(&gaps), 3),
        gap_p50_hours: percentile(&gaps, 50.0).map(|v| round_to(v, 2)),
        gap_p90_hours: percentile(&gaps, 90.0).map(|v| round_to(v, 2)),
    }
}

/// Local calendar days touched by work sessions. Each commit contributes
/// its own local date; a session fills every day between its earliest and
/// latest local dates, which may belong to commits in different offsets.
fn active_days(times: &[OffsetDateTime], streak_gap: Duration) -> BTreeSet<Date> {
    let mut days: BTreeSet<Date> = BTreeSet::new();
    let mut session: Option<(OffsetDateTime, Date, Date)> = None;
    for &at in times {
        let date = at.date();
        session = match session {
            Some((last, lo, hi)) if at - last <= streak_gap => {
                Some((at, lo.min(date), hi.max(date)))
            }
            Some((_, lo, hi)) => {
                fill_days(&mut days, lo, hi);
                Some((at, date, date))
            }
            None => Some((at, date, date)),
        };
    }
    if let Some((_, lo, hi)) = session {
        fill_days(&mut days, lo, hi);
    }
    days
}

fn fill_days(days: &mut BTreeSet<Date>, first: Date, last: Date) {
    let mut day = first;
    while day <= last {
        days.insert(day);
        match day.next_day() {
            Some(next) => day = next,
            None => break,
        }
    }
}

/// Longest run of consecutive days. Earliest run wins ties.
fn longest_streak(days: &BTreeSet<Date>) -> Option<Streak> {
    let mut best: Option<(Date, Date, u32)> = None;
    let mut current: Option<(Date, Date, u32)> = None;
    for &day in days {
        current = match current {
            Some((start, end, len)) if end.next_day() == Some(day) => Some((start, day, len + 1)),
            _ => Some((day, day, 1)),
        };
        if let Some(run) = current {
            if best.map(|b| run.2 > b.2).unwrap_or(true) {
                best = Some(run);
            }
        }
    }
    best.map(|(start, end, days)| Streak {
        days,
        start: format_date(start),
        end: format_date(end),
    })
}

fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Most common commit weekday; Monday-first order breaks ties.
fn peak_weekday(times: &[OffsetDateTime]) -> Option<Weekday> {
    let mut counts = [0usize; 7];
    for t in times {
        counts[t.weekday().number_days_from_monday() as usize] += 1;
    }
    let (idx, &n) = counts
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))?;
    if n == 0 {
        return None;
    }
    let mut day = Weekday::Monday;
    for _ in 0..idx {
        day = day.next();
    }
    Some(day)
}

/// Most common time-of-day window; declaration order breaks ties.
fn peak_window(times: &[OffsetDateTime]) -> Option<DayWindow> {
    let mut counts = [0usize; 4];
    for t in times {
        let w = DayWindow::from_hour(t.hour());
        let idx = DayWindow::ALL.iter().position(|x| *x == w).unwrap_or(3);
        counts[idx] += 1;
    }
    let (idx, &n) = counts
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))?;
    (n > 0).then_some(DayWindow::ALL[idx])
}

/// B = (σ − μ) / (σ + μ) over gaps.
fn burstiness(gaps: &[f64]) -> f64 {
    if gaps.len() < 2 {
        return 0.0;
    }
    let (Some(mu), Some(sigma)) = (mean(gaps), std_dev(gaps)) else {
        return 0.0;
    };
    if sigma + mu <= 0.0 {
        return 0.0;
    }
    (sigma - mu) / (sigma + mu)
}
