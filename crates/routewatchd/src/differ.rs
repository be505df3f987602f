//! Line-oriented snapshot comparison.
//!
//! Uses Myers' O(ND) difference algorithm in its linear-space form: common
//! prefix and suffix are trimmed, then the remaining region is split at the
//! middle snake found by a simultaneous forward and reverse search, and each
//! half is solved recursively. The result is a minimal edit script (the
//! longest common subsequence is kept as context), the same algorithm GNU
//! diff and git use by default.
//!
//! Lines are opaque tokens compared for exact equality. The output only
//! depends on the inputs: no hashing, no set iteration.

use serde::{Deserialize, Serialize};

use crate::types::RouteSnapshot;

/// Default number of context lines in unified output.
pub const DEFAULT_CONTEXT: usize = 3;

/// Header labels of the unified rendering.
const OLD_LABEL: &str = "Previous Routes";
const NEW_LABEL: &str = "Current Routes";

/// One step of the edit script, with indices into the old/new line lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffOp {
    /// Line kept: `old[old] == new[new]`.
    Equal {
        /// Index in the previous snapshot.
        old: usize,
        /// Index in the current snapshot.
        new: usize,
    },
    /// Line removed from the previous snapshot.
    Delete {
        /// Index in the previous snapshot.
        old: usize,
    },
    /// Line added in the current snapshot.
    Insert {
        /// Index in the current snapshot.
        new: usize,
    },
}

impl DiffOp {
    fn is_equal(&self) -> bool {
        matches!(self, DiffOp::Equal { .. })
    }
}

/// Outcome of comparing two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    /// Lines only in the current snapshot, in current order.
    pub added: Vec<String>,
    /// Lines only in the previous snapshot, in previous order.
    pub removed: Vec<String>,
    /// True iff `added` or `removed` is non-empty.
    pub changed: bool,
    /// Unified-diff rendering; empty when unchanged.
    pub unified: Vec<String>,
}

/// Compares two snapshots.
pub fn diff(previous: &RouteSnapshot, current: &RouteSnapshot) -> DiffResult {
    diff_with_context(previous, current, DEFAULT_CONTEXT)
}

/// Compares two snapshots, rendering `context` lines around each hunk.
pub fn diff_with_context(
    previous: &RouteSnapshot,
    current: &RouteSnapshot,
    context: usize,
) -> DiffResult {
    let old = previous.lines();
    let new = current.lines();
    let ops = diff_lines(old, new);

    let mut added = Vec::new();
    let mut removed = Vec::new();
    for op in &ops {
        match *op {
            DiffOp::Delete { old: i } => removed.push(old[i].clone()),
            DiffOp::Insert { new: j } => added.push(new[j].clone()),
            DiffOp::Equal { .. } => {}
        }
    }

    let changed = !added.is_empty() || !removed.is_empty();
    let unified = if changed {
        render_unified(old, new, &ops, context)
    } else {
        Vec::new()
    };

    DiffResult {
        added,
        removed,
        changed,
        unified,
    }
}

/// Computes a minimal edit script turning `old` into `new`.
pub fn diff_lines<T: PartialEq>(old: &[T], new: &[T]) -> Vec<DiffOp> {
    let mut ops = Vec::with_capacity(old.len().max(new.len()));
    diff_region(&mut ops, old, 0, new, 0);
    ops
}

fn diff_region<T: PartialEq>(
    ops: &mut Vec<DiffOp>,
    old: &[T],
    old_base: usize,
    new: &[T],
    new_base: usize,
) {
    let prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
    for i in 0..prefix {
        ops.push(DiffOp::Equal {
            old: old_base + i,
            new: new_base + i,
        });
    }

    let old_rest = &old[prefix..];
    let new_rest = &new[prefix..];
    let suffix = old_rest
        .iter()
        .rev()
        .zip(new_rest.iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let old_mid = &old_rest[..old_rest.len() - suffix];
    let new_mid = &new_rest[..new_rest.len() - suffix];
    let old_mid_base = old_base + prefix;
    let new_mid_base = new_base + prefix;

    if old_mid.is_empty() {
        ops.extend((0..new_mid.len()).map(|j| DiffOp::Insert {
            new: new_mid_base + j,
        }));
    } else if new_mid.is_empty() {
        ops.extend((0..old_mid.len()).map(|i| DiffOp::Delete {
            old: old_mid_base + i,
        }));
    } else if let Some((x, y)) = middle_snake(old_mid, new_mid) {
        diff_region(ops, &old_mid[..x], old_mid_base, &new_mid[..y], new_mid_base);
        diff_region(
            ops,
            &old_mid[x..],
            old_mid_base + x,
            &new_mid[y..],
            new_mid_base + y,
        );
    } else {
        // No common line at all
        ops.extend((0..old_mid.len()).map(|i| DiffOp::Delete {
            old: old_mid_base + i,
        }));
        ops.extend((0..new_mid.len()).map(|j| DiffOp::Insert {
            new: new_mid_base + j,
        }));
    }

    let old_suffix_base = old_mid_base + old_mid.len();
    let new_suffix_base = new_mid_base + new_mid.len();
    for i in 0..suffix {
        ops.push(DiffOp::Equal {
            old: old_suffix_base + i,
            new: new_suffix_base + i,
        });
    }
}

/// Finds a split point on an optimal edit path through `old` x `new`.
///
/// Both inputs are non-empty and share no common prefix or suffix. Returns
/// the end of the forward snake where the forward and reverse searches first
/// overlap, or `None` when the sequences have nothing in common.
fn middle_snake<T: PartialEq>(old: &[T], new: &[T]) -> Option<(usize, usize)> {
    let n = old.len() as isize;
    let m = new.len() as isize;
    let max_d = (n + m + 1) / 2;
    let offset = max_d;
    let v_len = (2 * max_d + 2) as usize;

    // Furthest x reached on each diagonal k = x - y; -1 = not reached.
    let mut vf = vec![-1isize; v_len];
    let mut vb = vec![-1isize; v_len];
    vf[(offset + 1) as usize] = 0;
    vb[(offset + 1) as usize] = 0;

    let delta = n - m;
    // With odd delta the paths meet during a forward step, else a reverse one.
    let front = delta % 2 != 0;

    // Diagonals that ran off the grid are skipped in later rounds.
    let (mut kf_start, mut kf_end, mut kb_start, mut kb_end) = (0isize, 0isize, 0isize, 0isize);

    for d in 0..max_d {
        let mut k = -d + kf_start;
        while k <= d - kf_end {
            let ki = (offset + k) as usize;
            let mut x = if k == -d || (k != d && vf[ki - 1] < vf[ki + 1]) {
                vf[ki + 1]
            } else {
                vf[ki - 1] + 1
            };
            let mut y = x - k;
            while x < n && y < m && old[x as usize] == new[y as usize] {
                x += 1;
                y += 1;
            }
            vf[ki] = x;

            if x > n {
                kf_end += 2;
            } else if y > m {
                kf_start += 2;
            } else if front {
                let kb = offset + delta - k;
                if kb >= 0 && kb < v_len as isize && vb[kb as usize] != -1 {
                    let x_rev = n - vb[kb as usize];
                    if x >= x_rev {
                        return Some((x as usize, y as usize));
                    }
                }
            }
            k += 2;
        }

        let mut k = -d + kb_start;
        while k <= d - kb_end {
            let ki = (offset + k) as usize;
            let mut x = if k == -d || (k != d && vb[ki - 1] < vb[ki + 1]) {
                vb[ki + 1]
            } else {
                vb[ki - 1] + 1
            };
            let mut y = x - k;
            while x < n && y < m && old[(n - x - 1) as usize] == new[(m - y - 1) as usize] {
                x += 1;
                y += 1;
            }
            vb[ki] = x;

            if x > n {
                kb_end += 2;
            } else if y > m {
                kb_start += 2;
            } else if !front {
                let kf = offset + delta - k;
                if kf >= 0 && kf < v_len as isize && vf[kf as usize] != -1 {
                    let x_fwd = vf[kf as usize];
                    let y_fwd = x_fwd - (kf - offset);
                    if x_fwd >= n - x {
                        return Some((x_fwd as usize, y_fwd as usize));
                    }
                }
            }
            k += 2;
        }
    }

    None
}

/// Renders the edit script as a unified diff.
fn render_unified(old: &[String], new: &[String], ops: &[DiffOp], context: usize) -> Vec<String> {
    // Cursor positions before each op
    let mut positions = Vec::with_capacity(ops.len());
    let (mut oi, mut ni) = (0usize, 0usize);
    for op in ops {
        positions.push((oi, ni));
        match op {
            DiffOp::Equal { .. } => {
                oi += 1;
                ni += 1;
            }
            DiffOp::Delete { .. } => oi += 1,
            DiffOp::Insert { .. } => ni += 1,
        }
    }

    let mut lines = vec![format!("--- {}", OLD_LABEL), format!("+++ {}", NEW_LABEL)];

    for (start, end) in hunk_ranges(ops, context) {
        let hunk = &ops[start..end];
        let (old_start, new_start) = positions[start];
        let old_len = hunk.iter().filter(|op| !matches!(op, DiffOp::Insert { .. })).count();
        let new_len = hunk.iter().filter(|op| !matches!(op, DiffOp::Delete { .. })).count();
        lines.push(format!(
            "@@ -{} +{} @@",
            format_range(old_start, old_len),
            format_range(new_start, new_len)
        ));

        let mut i = 0;
        while i < hunk.len() {
            if let DiffOp::Equal { old: oi, .. } = hunk[i] {
                lines.push(format!(" {}", old[oi]));
                i += 1;
                continue;
            }
            // A change block: removals first, then additions
            let block_end = hunk[i..]
                .iter()
                .position(DiffOp::is_equal)
                .map_or(hunk.len(), |p| i + p);
            for op in &hunk[i..block_end] {
                if let DiffOp::Delete { old: oi } = *op {
                    lines.push(format!("-{}", old[oi]));
                }
            }
            for op in &hunk[i..block_end] {
                if let DiffOp::Insert { new: nj } = *op {
                    lines.push(format!("+{}", new[nj]));
                }
            }
            i = block_end;
        }
    }

    lines
}

/// Groups changes into `[start, end)` op ranges padded with context.
fn hunk_ranges(ops: &[DiffOp], context: usize) -> Vec<(usize, usize)> {
    let mut ranges: Vec<(usize, usize)> = Vec::new();

    for (idx, op) in ops.iter().enumerate() {
        if op.is_equal() {
            continue;
        }
        let start = idx.saturating_sub(context);
        let end = (idx + 1 + context).min(ops.len());
        match ranges.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => ranges.push((start, end)),
        }
    }

    ranges
}

/// Unified range: `start` is 0-based; a single line prints without a count,
/// an empty range prints the preceding line number.
fn format_range(start: usize, len: usize) -> String {
    match len {
        0 => format!("{},0", start),
        1 => format!("{}", start + 1),
        _ => format!("{},{}", start + 1, len),
    }
}
