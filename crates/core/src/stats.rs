use std::collections::HashMap;

use chrono::{DateTime, Datelike, TimeDelta, Timelike, Utc};
use log::debug;
use serde::Serialize;

use crate::types::VideoRecord;

pub const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

const KST_OFFSET_HOURS: i64 = 9;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordDailyViews {
    pub channel_name: String,
    pub title: String,
    pub view_count: u64,
    pub days_since_publish: u64,
    pub daily_views: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelDailyViews {
    pub channel_name: String,
    pub daily_views: u64,
    pub videos: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DailyViewsReport {
    /// Per-channel sums, highest first.
    pub channels: Vec<ChannelDailyViews>,
    pub total: u64,
    pub rows: Vec<RecordDailyViews>,
}

/// Average views per day since publishing, summed per channel.
///
/// Age is counted in whole days with a floor of one day. Records without a
/// publish time are left out.
pub fn daily_average_views<'a>(
    records: impl IntoIterator<Item = &'a VideoRecord>,
    now: DateTime<Utc>,
) -> DailyViewsReport {
    let mut rows = Vec::new();
    for record in records {
        let Some(published_at) = record.published_at else {
            debug!("Skipping {} in daily averages, no publish time", record.video_id);
            continue;
        };
        let days = (now - published_at).num_days().max(1) as u64;
        rows.push(RecordDailyViews {
            channel_name: record.channel_name.clone(),
            title: record.title.clone(),
            view_count: record.view_count,
            days_since_publish: days,
            daily_views: record.view_count / days,
        });
    }

    let mut by_channel: HashMap<&str, (u64, usize)> = HashMap::new();
    for row in &rows {
        let entry = by_channel.entry(row.channel_name.as_str()).or_default();
        entry.0 += row.daily_views;
        entry.1 += 1;
    }
    let mut channels: Vec<ChannelDailyViews> = by_channel
        .into_iter()
        .map(|(name, (daily_views, videos))| ChannelDailyViews {
            channel_name: name.to_string(),
            daily_views,
            videos,
        })
        .collect();
    channels.sort_by(|a, b| {
        b.daily_views
            .cmp(&a.daily_views)
            .then_with(|| a.channel_name.cmp(&b.channel_name))
    });

    DailyViewsReport {
        total: rows.iter().map(|row| row.daily_views).sum(),
        channels,
        rows,
    }
}

/// Upload counts by weekday (Monday first) and hour of day, in Korea
/// Standard Time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct UploadPattern {
    pub weekday: [usize; 7],
    pub hourly: [usize; 24],
    pub total: usize,
}

impl UploadPattern {
    pub fn from_timestamps(timestamps: impl IntoIterator<Item = DateTime<Utc>>) -> Self {
        let mut pattern = Self::default();
        for at in timestamps {
            let local = at.naive_utc() + TimeDelta::hours(KST_OFFSET_HOURS);
            pattern.weekday[local.weekday().num_days_from_monday() as usize] += 1;
            pattern.hourly[local.hour() as usize] += 1;
            pattern.total += 1;
        }
        pattern
    }

    pub fn busiest_weekday(&self) -> Option<&'static str> {
        busiest(&self.weekday).map(|i| WEEKDAY_LABELS[i])
    }

    pub fn busiest_hour(&self) -> Option<usize> {
        busiest(&self.hourly)
    }
}

fn busiest(counts: &[usize]) -> Option<usize> {
    counts
        .iter()
        .enumerate()
        .filter(|(_, count)| **count > 0)
        .max_by(|(ia, a), (ib, b)| a.cmp(b).then_with(|| ib.cmp(ia)))
        .map(|(i, _)| i)
}
