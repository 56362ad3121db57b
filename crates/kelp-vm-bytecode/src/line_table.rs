//! Mapping from instruction offsets to source lines

use serde::{Deserialize, Serialize};

use crate::error::{BytecodeError, Result};
use crate::operand::FileIndex;

/// One line table entry: every instruction from `bytecode_start` up to the
/// next entry's start belongs to `line` of `file`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInfo {
    /// First word offset covered by this entry
    pub bytecode_start: u32,
    /// 1-based source line
    pub line: u32,
    /// Source file the line belongs to
    pub file: FileIndex,
}

impl LineInfo {
    /// Create an entry in file 0
    pub const fn new(bytecode_start: u32, line: u32) -> Self {
        Self {
            bytecode_start,
            line,
            file: FileIndex(0),
        }
    }
}

/// Line table, sorted by strictly increasing `bytecode_start`, first entry at 0
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LineInfo>", into = "Vec<LineInfo>")]
pub struct LineTable {
    entries: Vec<LineInfo>,
}

impl LineTable {
    /// Build a line table, checking ordering and coverage of offset 0
    pub fn new(entries: Vec<LineInfo>) -> Result<Self> {
        match entries.first() {
            None => {
                return Err(BytecodeError::InvalidLineTable("table is empty".into()));
            }
            Some(first) if first.bytecode_start != 0 => {
                return Err(BytecodeError::InvalidLineTable(format!(
                    "first entry starts at {}, not 0",
                    first.bytecode_start
                )));
            }
            Some(_) => {}
        }
        if let Some(pair) = entries
            .windows(2)
            .find(|w| w[0].bytecode_start >= w[1].bytecode_start)
        {
            return Err(BytecodeError::InvalidLineTable(format!(
                "offset {} does not increase past {}",
                pair[1].bytecode_start, pair[0].bytecode_start
            )));
        }
        Ok(Self { entries })
    }

    /// Entry owning `offset`: the last one whose `bytecode_start <= offset`.
    ///
    /// Offsets past the last entry belong to it.
    pub fn lookup(&self, offset: usize) -> &LineInfo {
        debug_assert!(!self.entries.is_empty());
        let mut start = 0;
        let mut size = self.entries.len();
        loop {
            if size == 1 {
                return &self.entries[start];
            }
            let half = size / 2;
            if self.entries[start + half].bytecode_start as usize <= offset {
                start += half;
                size -= half;
            } else {
                size = half;
            }
        }
    }

    /// Source line for the instruction at `offset`
    #[inline]
    pub fn lookup_line(&self, offset: usize) -> u32 {
        self.lookup(offset).line
    }

    /// All entries, in order
    #[inline]
    pub fn entries(&self) -> &[LineInfo] {
        &self.entries
    }

    /// Number of entries
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a constructed table
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TryFrom<Vec<LineInfo>> for LineTable {
    type Error = BytecodeError;

    fn try_from(entries: Vec<LineInfo>) -> Result<Self> {
        Self::new(entries)
    }
}

impl From<LineTable> for Vec<LineInfo> {
    fn from(table: LineTable) -> Self {
        table.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn table(pairs: &[(u32, u32)]) -> LineTable {
        LineTable::new(pairs.iter().map(|&(o, l)| LineInfo::new(o, l)).collect()).unwrap()
    }

    #[test]
    fn test_lookup_ranges() {
        let t = table(&[(0, 1), (10, 2), (25, 5)]);
        assert_eq!(t.lookup_line(0), 1);
        assert_eq!(t.lookup_line(9), 1);
        assert_eq!(t.lookup_line(10), 2);
        assert_eq!(t.lookup_line(24), 2);
        assert_eq!(t.lookup_line(25), 5);
        assert_eq!(t.lookup_line(100), 5);
    }

    #[test]
    fn test_single_entry_covers_everything() {
        let t = table(&[(0, 42)]);
        assert_eq!(t.lookup_line(0), 42);
        assert_eq!(t.lookup_line(usize::MAX), 42);
    }

    #[test]
    fn test_rejects_bad_tables() {
        assert!(matches!(
            LineTable::new(vec![]),
            Err(BytecodeError::InvalidLineTable(_))
        ));
        assert!(LineTable::new(vec![LineInfo::new(3, 1)]).is_err());
        assert!(LineTable::new(vec![LineInfo::new(0, 1), LineInfo::new(0, 2)]).is_err());
        assert!(LineTable::new(vec![LineInfo::new(0, 1), LineInfo::new(8, 2), LineInfo::new(4, 3)]).is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let bad = r#"[{"bytecode_start":5,"line":1,"file":0}]"#;
        assert!(serde_json::from_str::<LineTable>(bad).is_err());

        let good = r#"[{"bytecode_start":0,"line":1,"file":0}]"#;
        let t: LineTable = serde_json::from_str(good).unwrap();
        assert_eq!(t.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_lookup_matches_linear_scan(
            gaps in proptest::collection::vec(1u32..50, 0..40),
            query in 0usize..3000,
        ) {
            let mut offset = 0;
            let mut entries = vec![LineInfo::new(0, 1)];
            for (i, gap) in gaps.iter().enumerate() {
                offset += gap;
                entries.push(LineInfo::new(offset, i as u32 + 2));
            }
            let t = LineTable::new(entries.clone()).unwrap();

            let expected = entries
                .iter()
                .rev()
                .find(|e| e.bytecode_start as usize <= query)
                .unwrap();
            prop_assert_eq!(t.lookup(query), expected);
        }
    }
}
