use super::{ContigError, ResidueRef};
use std::fmt;
use std::str::FromStr;

/// A contiguous run of motif residues on one chain, inclusive on both ends.
///
/// Residue numbers are signed, as in PDB files; `A-3--1` is the block of
/// residues -3, -2 and -1 on chain A.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MotifBlock {
    pub chain: char,
    pub start: isize,
    pub end: isize,
}

impl MotifBlock {
    pub fn new(chain: char, start: isize, end: isize) -> Result<Self, ContigError> {
        if start > end {
            return Err(ContigError::InvalidRange {
                token: format!("{chain}{start}-{end}"),
                start,
                end,
            });
        }
        Ok(Self { chain, start, end })
    }

    pub fn single(chain: char, number: isize) -> Self {
        Self {
            chain,
            start: number,
            end: number,
        }
    }

    pub fn len(&self) -> usize {
        usize::try_from(self.end - self.start + 1).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    pub fn residues(&self) -> impl Iterator<Item = ResidueRef> + '_ {
        (self.start..=self.end).map(move |n| ResidueRef::new(self.chain, n))
    }

    fn parse(token: &str) -> Result<Self, ContigError> {
        let mut chars = token.chars();
        let chain = match chars.next() {
            Some(c) if c.is_ascii_alphabetic() => c,
            _ => return Err(ContigError::MissingChain(token.to_string())),
        };
        let body = chars.as_str();

        let parse_num = |value: &str| -> Result<isize, ContigError> {
            value.trim().parse().map_err(|_| ContigError::InvalidNumber {
                token: token.to_string(),
                value: value.to_string(),
            })
        };

        // The separator is the first hyphen after the start's own sign.
        let separator = body
            .char_indices()
            .skip(1)
            .find(|&(_, c)| c == '-')
            .map(|(i, _)| i);
        let (start, end) = match separator {
            Some(i) => (parse_num(&body[..i])?, parse_num(&body[i + 1..])?),
            None => {
                let n = parse_num(body)?;
                (n, n)
            }
        };
        Self::new(chain, start, end).map_err(|_| ContigError::InvalidRange {
            token: token.to_string(),
            start,
            end,
        })
    }
}

impl fmt::Display for MotifBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}-{}", self.chain, self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Free scaffold with a length range and no residue identity.
    Scaffold { min_len: usize, max_len: usize },
    /// Residues copied from the reference structure.
    Motif(MotifBlock),
}

impl Segment {
    fn parse(token: &str) -> Result<Self, ContigError> {
        let starts_with_digit = token.chars().next().is_some_and(|c| c.is_ascii_digit());
        if !starts_with_digit {
            return MotifBlock::parse(token).map(Segment::Motif);
        }

        let parse_len = |value: &str| -> Result<usize, ContigError> {
            value.trim().parse().map_err(|_| ContigError::InvalidNumber {
                token: token.to_string(),
                value: value.to_string(),
            })
        };
        let (min_len, max_len) = match token.split_once('-') {
            Some((lo, hi)) => (parse_len(lo)?, parse_len(hi)?),
            None => {
                let n = parse_len(token)?;
                (n, n)
            }
        };
        if min_len > max_len {
            return Err(ContigError::InvalidRange {
                token: token.to_string(),
                start: min_len as isize,
                end: max_len as isize,
            });
        }
        Ok(Segment::Scaffold { min_len, max_len })
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Scaffold { min_len, max_len } => write!(f, "{}-{}", min_len, max_len),
            Segment::Motif(block) => write!(f, "{}", block),
        }
    }
}

/// An ordered sequence of scaffold and motif segments.
///
/// Segment order is significant: concatenating the motif blocks in order yields
/// the motif, and that order defines the residue correspondence between the
/// reference and design frames. An empty contig is legal and describes a pure
/// scaffold with no motif.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Contig {
    segments: Vec<Segment>,
}

impl Contig {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Parses a contig string such as `31-31/B25-46/32-32/A32/A4/A5`.
    ///
    /// Empty tokens (from leading, trailing or doubled `/`) are ignored.
    pub fn parse(contig: &str) -> Result<Self, ContigError> {
        let segments = contig
            .split('/')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(Segment::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn motif_blocks(&self) -> impl Iterator<Item = &MotifBlock> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Motif(block) => Some(block),
            Segment::Scaffold { .. } => None,
        })
    }

    pub fn motif_length(&self) -> usize {
        self.motif_blocks().map(MotifBlock::len).sum()
    }

    /// Expands the motif blocks into the ordered residue list they denote.
    pub fn to_residues(&self) -> Vec<ResidueRef> {
        self.motif_blocks().flat_map(MotifBlock::residues).collect()
    }

    /// Residue numbers of the motif in contig order, chain identity dropped.
    pub fn to_indices(&self) -> Vec<isize> {
        self.to_residues().into_iter().map(|r| r.number).collect()
    }

    /// Returns a contig holding only the motif blocks, scaffold gaps removed.
    pub fn motif_only(&self) -> Self {
        Self {
            segments: self.motif_blocks().copied().map(Segment::Motif).collect(),
        }
    }
}

impl FromStr for Contig {
    type Err = ContigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Contig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}
