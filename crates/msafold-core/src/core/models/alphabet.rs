use phf::{Set, phf_set};

pub const GAP: char = '-';

/// One-letter symbols accepted in any residue string handed to the predictor: the 20
/// standard amino acids, the gap, and the ambiguity/special codes.
static ALPHABET: Set<char> = phf_set! {
    'A', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'K', 'L',
    'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'V', 'W', 'Y',
    '-',
    'X', 'B', 'Z', 'U', 'O', 'J',
};

/// A symbol outside the accepted alphabet, with its zero-based position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidSymbol {
    pub position: usize,
    pub symbol: char,
}

/// Returns whether `symbol` belongs to the alphabet. Lower-case letters are accepted
/// when their upper-case form is.
#[inline]
pub fn is_valid_symbol(symbol: char) -> bool {
    ALPHABET.contains(&symbol.to_ascii_uppercase())
}

/// Finds the first symbol of `residues` outside the alphabet.
pub fn validate(residues: &str) -> Result<(), InvalidSymbol> {
    match residues
        .chars()
        .enumerate()
        .find(|(_, symbol)| !is_valid_symbol(*symbol))
    {
        Some((position, symbol)) => Err(InvalidSymbol { position, symbol }),
        None => Ok(()),
    }
}

/// Removes gaps and insertion states (lower-case letters), leaving the match-state
/// residues of an A3M/FASTA row.
pub fn match_states(residues: &str) -> String {
    residues.chars().filter(|c| c.is_ascii_uppercase()).collect()
}
