use text_size::{TextRange, TextSize};

/// One normalized replacement: `span` of the old text was replaced by
/// `new_len` characters at the same ordinal position.
///
/// A position-ordered, non-overlapping list of these fully describes one edit
/// generation.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChangeRange {
    pub span: TextRange,
    pub new_len: TextSize,
}

impl ChangeRange {
    pub fn new(span: TextRange, new_len: TextSize) -> Self {
        Self { span, new_len }
    }

    /// A change with no deleted and no inserted text.
    pub fn is_noop(&self) -> bool {
        self.span.is_empty() && self.new_len == TextSize::new(0)
    }
}

impl std::fmt::Debug for ChangeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} -> {:?}", self.span, self.new_len)
    }
}

/// Edit scripts are composed as operation sequences over the input text.
///
/// `Retain` copies input characters through; `Replace` consumes `old` input
/// characters and produces `new` output characters. A trailing retain-to-end
/// is implicit, modeled by [`INFINITE`] so composition needs no text lengths.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Op {
    Retain(u64),
    Replace { old: u64, new: u64 },
}

const INFINITE: u64 = u64::MAX / 2;

fn to_ops(ranges: &[ChangeRange]) -> Vec<Op> {
    let mut ops = Vec::with_capacity(ranges.len() * 2 + 1);
    let mut pos: u64 = 0;
    for range in ranges {
        let start = u64::from(u32::from(range.span.start()));
        debug_assert!(start >= pos, "change ranges must be ordered and disjoint");
        if start > pos {
            ops.push(Op::Retain(start - pos));
        }
        ops.push(Op::Replace {
            old: u64::from(u32::from(range.span.len())),
            new: u64::from(u32::from(range.new_len)),
        });
        pos = u64::from(u32::from(range.span.end()));
    }
    ops.push(Op::Retain(INFINITE));
    ops
}

fn push_op(out: &mut Vec<Op>, op: Op) {
    match (out.last_mut(), op) {
        (_, Op::Retain(0)) | (_, Op::Replace { old: 0, new: 0 }) => {}
        (Some(Op::Retain(prev)), Op::Retain(n)) => *prev += n,
        (Some(Op::Replace { old, new }), Op::Replace { old: o, new: n }) => {
            *old += o;
            *new += n;
        }
        _ => out.push(op),
    }
}

fn ops_to_ranges(ops: &[Op]) -> Vec<ChangeRange> {
    let mut out = Vec::new();
    let mut pos: u64 = 0;
    for &op in ops {
        match op {
            Op::Retain(n) => pos += n,
            Op::Replace { old, new } => {
                out.push(ChangeRange::new(
                    TextRange::at(TextSize::new(pos as u32), TextSize::new(old as u32)),
                    TextSize::new(new as u32),
                ));
                pos += old;
            }
        }
    }
    out
}

/// Merges two adjacent edit generations into one.
///
/// `older` maps a text T0 to T1, `newer` maps T1 to T2; the result maps T0
/// directly to T2, with spans in T0 coordinates. Composition is function
/// composition and therefore associative; the output is canonical (ordered,
/// disjoint, touching ranges merged, no-op ranges dropped), so a chain whose
/// net effect is identity collapses to the empty list.
pub fn compose(older: &[ChangeRange], newer: &[ChangeRange]) -> Vec<ChangeRange> {
    let a_ops = to_ops(older);
    let b_ops = to_ops(newer);
    let mut out = Vec::new();

    let mut a_iter = a_ops.into_iter();
    let mut b_iter = b_ops.into_iter();
    let mut a = a_iter.next();
    let mut b = b_iter.next();

    while let (Some(a_op), Some(b_op)) = (&mut a, &mut b) {
        match (a_op, b_op) {
            (Op::Retain(x), Op::Retain(y)) => {
                if *x >= INFINITE && *y >= INFINITE {
                    break;
                }
                let step = (*x).min(*y);
                push_op(&mut out, Op::Retain(step));
                *x -= step;
                *y -= step;
                if *x == 0 {
                    a = a_iter.next();
                }
                if *y == 0 {
                    b = b_iter.next();
                }
            }
            (Op::Replace { old, new }, Op::Retain(y)) => {
                if *new == 0 {
                    // Pure deletion in the older generation passes through.
                    push_op(&mut out, Op::Replace { old: std::mem::take(old), new: 0 });
                    a = a_iter.next();
                    continue;
                }
                // The newer generation keeps `step` characters the older one
                // produced; the consumed old span is attributed to the first
                // emitted piece, adjacent pieces merge anyway.
                let step = (*new).min(*y);
                push_op(&mut out, Op::Replace { old: std::mem::take(old), new: step });
                *new -= step;
                *y -= step;
                if *new == 0 {
                    a = a_iter.next();
                }
                if *y == 0 {
                    b = b_iter.next();
                }
            }
            (Op::Retain(x), Op::Replace { old: b_old, new: b_new }) => {
                if *b_old == 0 {
                    // Pure insertion in the newer generation.
                    push_op(&mut out, Op::Replace { old: 0, new: std::mem::take(b_new) });
                    b = b_iter.next();
                    continue;
                }
                // The newer generation replaces characters the older one
                // retained; those map straight into T0 coordinates.
                let step = (*x).min(*b_old);
                push_op(&mut out, Op::Replace { old: step, new: std::mem::take(b_new) });
                *x -= step;
                *b_old -= step;
                if *x == 0 {
                    a = a_iter.next();
                }
                if *b_old == 0 {
                    b = b_iter.next();
                }
            }
            (Op::Replace { old: a_old, new: a_new }, Op::Replace { old: b_old, new: b_new }) => {
                if *b_old == 0 {
                    push_op(&mut out, Op::Replace { old: 0, new: std::mem::take(b_new) });
                    b = b_iter.next();
                    continue;
                }
                if *a_new == 0 {
                    push_op(&mut out, Op::Replace { old: std::mem::take(a_old), new: 0 });
                    a = a_iter.next();
                    continue;
                }
                // The newer generation deletes characters the older one
                // produced; only the older old span reaches T0.
                let step = (*a_new).min(*b_old);
                push_op(&mut out, Op::Replace { old: std::mem::take(a_old), new: 0 });
                *a_new -= step;
                *b_old -= step;
                if *b_old == 0 {
                    push_op(&mut out, Op::Replace { old: 0, new: std::mem::take(b_new) });
                    b = b_iter.next();
                }
                if *a_new == 0 {
                    a = a_iter.next();
                }
            }
        }
    }

    ops_to_ranges(&out)
}

/// Folds a chain of generations, oldest first, into a single canonical list.
pub fn compose_all<'a>(generations: impl IntoIterator<Item = &'a [ChangeRange]>) -> Vec<ChangeRange> {
    let mut generations = generations.into_iter();
    let Some(first) = generations.next() else {
        return Vec::new();
    };
    let mut merged = compose(first, &[]);
    for generation in generations {
        merged = compose(&merged, generation);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(start: u32, end: u32, new_len: u32) -> ChangeRange {
        ChangeRange::new(
            TextRange::new(TextSize::new(start), TextSize::new(end)),
            TextSize::new(new_len),
        )
    }

    #[test]
    fn disjoint_generations_pass_through() {
        // T0 "hello world": replace [0,5) by 7 chars, then delete 2 chars
        // that originally sat at [6, 8).
        let merged = compose(&[change(0, 5, 7)], &[change(8, 10, 0)]);
        assert_eq!(merged, vec![change(0, 5, 7), change(6, 8, 0)]);
    }

    #[test]
    fn insert_then_delete_collapses_to_identity() {
        let merged = compose(&[change(0, 0, 1)], &[change(0, 1, 0)]);
        assert_eq!(merged, Vec::new());
    }

    #[test]
    fn overlapping_generations_combine() {
        // "abc" -> "xyz" -> "x12345z"
        let merged = compose(&[change(0, 3, 3)], &[change(1, 2, 5)]);
        assert_eq!(merged, vec![change(0, 3, 7)]);
    }

    #[test]
    fn newer_change_reaches_past_older_insertion() {
        // T0 "abcdef": insert "XX" at 3 -> "abcXXdef"; delete [2, 7) ("cXXde").
        let merged = compose(&[change(3, 3, 2)], &[change(2, 7, 0)]);
        assert_eq!(merged, vec![change(2, 5, 0)]);
    }

    #[test]
    fn touching_output_ranges_merge() {
        // Delete [0,2), then delete what is now [0,2) (originally [2,4)).
        let merged = compose(&[change(0, 2, 0)], &[change(0, 2, 0)]);
        assert_eq!(merged, vec![change(0, 4, 0)]);
    }

    #[test]
    fn compose_is_associative() {
        let g1 = vec![change(0, 2, 4), change(5, 6, 0)];
        let g2 = vec![change(1, 3, 1), change(6, 6, 2)];
        let g3 = vec![change(0, 5, 3)];

        let left = compose(&compose(&g1, &g2), &g3);
        let right = compose(&g1, &compose(&g2, &g3));
        assert_eq!(left, right);
    }

    /// Derives a well-formed generation for a text of length `len` from raw
    /// fuzz bytes, returning the ranges and the resulting text length.
    fn generation_from_seed(len: u32, seed: &[(u8, u8, u8)]) -> (Vec<ChangeRange>, u32) {
        let mut ranges = Vec::new();
        let mut new_len = len;
        let mut pos = 0u32;
        for &(a, b, c) in seed {
            if pos > len {
                break;
            }
            let start = pos + u32::from(a) % (len - pos + 1);
            let deleted = u32::from(b) % (len - start + 1);
            let inserted = u32::from(c) % 5;
            if deleted == 0 && inserted == 0 {
                continue;
            }
            ranges.push(change(start, start + deleted, inserted));
            new_len = new_len - deleted + inserted;
            pos = start + deleted;
        }
        (ranges, new_len)
    }

    proptest::proptest! {
        #[test]
        fn compose_is_associative_for_arbitrary_chains(
            len in 0u32..40,
            s1 in proptest::collection::vec((0u8..255, 0u8..255, 0u8..255), 0..4),
            s2 in proptest::collection::vec((0u8..255, 0u8..255, 0u8..255), 0..4),
            s3 in proptest::collection::vec((0u8..255, 0u8..255, 0u8..255), 0..4),
        ) {
            let (g1, len1) = generation_from_seed(len, &s1);
            let (g2, len2) = generation_from_seed(len1, &s2);
            let (g3, _) = generation_from_seed(len2, &s3);

            let left = compose(&compose(&g1, &g2), &g3);
            let right = compose(&g1, &compose(&g2, &g3));
            proptest::prop_assert_eq!(left, right);
        }
    }
}
