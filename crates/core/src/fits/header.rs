//! Ordered header card list.

use fitsio::header::Card as RawCard;
use fitsio::primary::build_primary_header;

use super::card::{Card, FitsValue};
use super::error::FitsError;

/// Header of a primary HDU, without the END card.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitsHeader {
    cards: Vec<Card>,
}

impl FitsHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the mandatory primary-header cards for an image.
    ///
    /// `axes` lists NAXIS1..NAXISn, fastest-varying axis first.
    pub fn primary(bitpix: i64, axes: &[usize]) -> Result<Self, FitsError> {
        let raw = build_primary_header(bitpix, axes)?;
        Ok(Self::from_raw(&raw))
    }

    /// Groups parsed records into cards, attaching each `CONTINUE` record
    /// to the long string it extends.
    pub(crate) fn from_raw(records: &[RawCard]) -> Self {
        let mut cards: Vec<Card> = Vec::with_capacity(records.len());
        for record in records {
            if record.keyword_str().trim_end() == "END" && record.value.is_none() {
                break;
            }
            if Card::is_continue_keyword(record) {
                if let Some(owner) = cards.last_mut().filter(|c| c.expects_continuation()) {
                    if owner.absorb_continuation(record) {
                        continue;
                    }
                }
            }
            cards.push(Card::from_raw(record));
        }
        Self { cards }
    }

    /// Records in header order, ready for the header writer.
    pub(crate) fn to_raw(&self) -> Vec<RawCard> {
        let mut records = Vec::with_capacity(self.cards.len());
        for card in &self.cards {
            card.to_raw(&mut records);
        }
        records
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// First value card with the given keyword.
    pub fn get(&self, keyword: &str) -> Option<&Card> {
        let keyword = keyword.to_uppercase();
        self.cards
            .iter()
            .find(|c| !c.is_commentary() && c.keyword() == keyword)
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.get(keyword).is_some()
    }

    pub fn value(&self, keyword: &str) -> Option<FitsValue> {
        self.get(keyword).and_then(Card::value)
    }

    pub fn get_int(&self, keyword: &str) -> Option<i64> {
        self.value(keyword).and_then(|v| v.as_i64())
    }

    pub fn get_float(&self, keyword: &str) -> Option<f64> {
        self.value(keyword).and_then(|v| v.as_f64())
    }

    pub fn get_text(&self, keyword: &str) -> Option<String> {
        self.value(keyword)
            .and_then(|v| v.as_str().map(str::to_string))
    }

    /// Value keywords in header order, each listed once.
    pub fn keywords(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.cards
            .iter()
            .filter(|c| !c.is_commentary())
            .map(Card::keyword)
            .filter(|k| seen.insert(*k))
            .collect()
    }

    /// Commentary cards (COMMENT, HISTORY, blank) with the given keyword.
    pub fn commentary(&self, keyword: &str) -> impl Iterator<Item = &Card> {
        let keyword = keyword.to_uppercase();
        self.cards
            .iter()
            .filter(move |c| c.is_commentary() && c.keyword() == keyword)
    }

    /// Replaces the first card with the same keyword, or appends.
    ///
    /// Commentary cards are always appended.
    pub fn set(&mut self, card: Card) {
        if !card.is_commentary() {
            if let Some(existing) = self
                .cards
                .iter_mut()
                .find(|c| !c.is_commentary() && c.keyword() == card.keyword())
            {
                *existing = card;
                return;
            }
        }
        self.push(card);
    }

    /// Appends a card without checking for duplicates.
    pub fn push(&mut self, card: Card) {
        self.cards.push(card);
    }

    /// Removes every value card with the given keyword.
    pub fn remove(&mut self, keyword: &str) -> usize {
        let keyword = keyword.to_uppercase();
        let before = self.cards.len();
        self.cards
            .retain(|c| c.is_commentary() || c.keyword() != keyword);
        before - self.cards.len()
    }

    /// Size in bytes of the data unit this header describes.
    pub fn data_len(&self) -> Result<usize, FitsError> {
        let bitpix = self
            .get_int("BITPIX")
            .ok_or_else(|| FitsError::missing_keyword("BITPIX"))?;
        if !matches!(bitpix, 8 | 16 | 32 | 64 | -32 | -64) {
            return Err(FitsError::UnsupportedBitpix(bitpix));
        }
        let naxis = self
            .get_int("NAXIS")
            .ok_or_else(|| FitsError::missing_keyword("NAXIS"))?;
        if !(0..=999).contains(&naxis) {
            return Err(FitsError::invalid_header(format!(
                "NAXIS out of range: {}",
                naxis
            )));
        }
        if naxis == 0 {
            return Ok(0);
        }

        let mut elements: usize = 1;
        for axis in 1..=naxis {
            let keyword = format!("NAXIS{}", axis);
            let len = self
                .get_int(&keyword)
                .ok_or_else(|| FitsError::missing_keyword(keyword.clone()))?;
            let len = usize::try_from(len).map_err(|_| {
                FitsError::invalid_header(format!("{} is negative: {}", keyword, len))
            })?;
            elements = elements
                .checked_mul(len)
                .ok_or_else(|| FitsError::invalid_header("data unit size overflows"))?;
        }

        let bytes_per_element = (bitpix.unsigned_abs() / 8) as usize;
        elements
            .checked_mul(bytes_per_element)
            .ok_or_else(|| FitsError::invalid_header("data unit size overflows"))
    }
}
