use crate::attendance::{mean_rate, AttendanceBucket};
use crate::models::{AttendanceStat, BucketShare, DistributionSummary};

/// Buckets a cohort's attendance stats for reporting. Buckets are listed
/// best first and always cover all four bands, empty ones included.
pub fn summarize(stats: &[AttendanceStat]) -> DistributionSummary {
    let total_students = stats.len();

    let buckets = AttendanceBucket::ALL
        .iter()
        .map(|&bucket| {
            let count = stats.iter().filter(|s| s.bucket == bucket).count();
            let percentage = if total_students == 0 {
                0.0
            } else {
                count as f64 / total_students as f64 * 100.0
            };
            BucketShare {
                bucket,
                count,
                percentage,
            }
        })
        .collect();

    DistributionSummary {
        total_students,
        buckets,
        total_missed: stats.iter().map(|s| s.missed_lessons).sum(),
        total_lessons: stats.iter().map(|s| s.total_lessons).sum(),
        average_attendance: mean_rate(stats),
    }
}
