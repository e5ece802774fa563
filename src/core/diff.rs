//! Line-oriented unified diff for reviewable patch artifacts.
//!
//! Uses Myers' shortest edit script; hunks carry three lines of context and
//! headers follow the `@@ -a,b +c,d @@` convention.

const CONTEXT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal(usize, usize),
    Delete(usize),
    Insert(usize),
}

fn shortest_edit(a: &[&str], b: &[&str]) -> Vec<Op> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    if n == 0 && m == 0 {
        return Vec::new();
    }
    let max = n + m;
    let offset = max;
    let idx = |k: isize| (k + offset) as usize;

    let mut v = vec![0isize; (2 * max + 2) as usize];
    // Step d only reads diagonals -d-1..=d+1, so each snapshot keeps just
    // that window together with its lowest diagonal.
    let mut trace: Vec<(isize, Vec<isize>)> = Vec::new();

    'search: for d in 0..=max {
        let lo = (-d - 1).max(-max);
        trace.push((lo, v[idx(lo)..=idx(d + 1)].to_vec()));
        let mut k = -d;
        while k <= d {
            let mut x = if k == -d || (k != d && v[idx(k - 1)] < v[idx(k + 1)]) {
                v[idx(k + 1)]
            } else {
                v[idx(k - 1)] + 1
            };
            let mut y = x - k;
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            v[idx(k)] = x;
            if x >= n && y >= m {
                break 'search;
            }
            k += 2;
        }
    }

    let mut ops = Vec::new();
    let (mut x, mut y) = (n, m);
    for (d, (lo, snapshot)) in trace.iter().enumerate().rev() {
        let d = d as isize;
        let at = |k: isize| snapshot[(k - lo) as usize];
        let k = x - y;
        let prev_k = if k == -d || (k != d && at(k - 1) < at(k + 1)) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = at(prev_k);
        let prev_y = prev_x - prev_k;
        while x > prev_x && y > prev_y {
            ops.push(Op::Equal((x - 1) as usize, (y - 1) as usize));
            x -= 1;
            y -= 1;
        }
        if d > 0 {
            if x == prev_x {
                ops.push(Op::Insert((y - 1) as usize));
            } else {
                ops.push(Op::Delete((x - 1) as usize));
            }
        }
        x = prev_x;
        y = prev_y;
    }
    ops.reverse();
    ops
}

fn format_range(start: usize, len: usize) -> String {
    let mut beginning = start + 1;
    if len == 1 {
        return beginning.to_string();
    }
    if len == 0 {
        beginning -= 1;
    }
    format!("{},{}", beginning, len)
}

/// Unified diff of `original` vs `modified`, or an empty string when the
/// two texts have identical lines.
pub fn unified_diff(original: &str, modified: &str, from_label: &str, to_label: &str) -> String {
    let a: Vec<&str> = original.lines().collect();
    let b: Vec<&str> = modified.lines().collect();
    let ops = shortest_edit(&a, &b);

    let changed: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| !matches!(op, Op::Equal(..)))
        .map(|(i, _)| i)
        .collect();
    let Some(&first) = changed.first() else {
        return String::new();
    };

    let mut groups: Vec<(usize, usize)> = Vec::new();
    let (mut group_start, mut group_end) = (first, first);
    // Changes separated by at most 2 * CONTEXT unchanged lines share a hunk.
    for &c in &changed[1..] {
        if c - group_end > 2 * CONTEXT + 1 {
            groups.push((group_start, group_end));
            group_start = c;
        }
        group_end = c;
    }
    groups.push((group_start, group_end));

    // old/new line cursor in front of each op
    let mut cursors = Vec::with_capacity(ops.len());
    let (mut old_line, mut new_line) = (0usize, 0usize);
    for op in &ops {
        cursors.push((old_line, new_line));
        match op {
            Op::Equal(..) => {
                old_line += 1;
                new_line += 1;
            }
            Op::Delete(_) => old_line += 1,
            Op::Insert(_) => new_line += 1,
        }
    }

    let mut out = vec![format!("--- {}", from_label), format!("+++ {}", to_label)];
    for (start, end) in groups {
        let lo = start.saturating_sub(CONTEXT);
        let hi = (end + CONTEXT).min(ops.len() - 1);
        let window = &ops[lo..=hi];
        let old_len = window.iter().filter(|op| !matches!(op, Op::Insert(_))).count();
        let new_len = window.iter().filter(|op| !matches!(op, Op::Delete(_))).count();
        let (old_start, new_start) = cursors[lo];
        out.push(format!(
            "@@ -{} +{} @@",
            format_range(old_start, old_len),
            format_range(new_start, new_len)
        ));
        for op in window {
            out.push(match *op {
                Op::Equal(i, _) => format!(" {}", a[i]),
                Op::Delete(i) => format!("-{}", a[i]),
                Op::Insert(j) => format!("+{}", b[j]),
            });
        }
    }

    out.join("\n") + "\n"
}
