use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Labels that raise the mood of whoever is listening.
pub const POSITIVE_LABELS: &[&str] = &[
    "Joy",
    "Amusement",
    "Satisfaction",
    "Excitement",
    "Pride",
    "Triumph",
    "Relief",
    "Romance",
    "Desire",
    "Admiration",
    "Adoration",
    "Love",
    "Interest",
    "Realization",
    "Surprise",
];

pub const NEGATIVE_LABELS: &[&str] = &[
    "Anger",
    "Sadness",
    "Fear",
    "Disgust",
    "Anxiety",
    "Distress",
    "Shame",
    "Guilt",
    "Embarrassment",
    "Contempt",
    "Disappointment",
    "Pain",
    "Awkwardness",
    "Boredom",
    "Confusion",
    "Doubt",
    "Tiredness",
];

/// Sign-valued sentiment attached to an emotion label or a timeline bucket.
///
/// Serialized as -1/0/+1 so downstream consumers can sum and plot it
/// directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sentiment {
    Negative,
    Neutral,
    Positive,
}

impl Sentiment {
    pub fn value(self) -> i8 {
        match self {
            Sentiment::Negative => -1,
            Sentiment::Neutral => 0,
            Sentiment::Positive => 1,
        }
    }

    pub fn from_value(value: i8) -> Option<Self> {
        match value {
            -1 => Some(Sentiment::Negative),
            0 => Some(Sentiment::Neutral),
            1 => Some(Sentiment::Positive),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
            Sentiment::Positive => "positive",
        }
    }
}

impl Serialize for Sentiment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.value())
    }
}

impl<'de> Deserialize<'de> for Sentiment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = i8::deserialize(deserializer)?;
        Sentiment::from_value(value).ok_or_else(|| {
            serde::de::Error::custom(format!("sentiment must be -1, 0 or 1, got {value}"))
        })
    }
}

/// Classify an emotion label by membership in the curated sets.
///
/// Total over arbitrary strings: anything that is neither positive nor
/// negative (including labels never seen before) is Neutral. Independent of
/// any probability attached to the label.
pub fn classify(label: &str) -> Sentiment {
    if POSITIVE_LABELS.contains(&label) {
        Sentiment::Positive
    } else if NEGATIVE_LABELS.contains(&label) {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_positive_and_negative() {
        assert_eq!(classify("Joy"), Sentiment::Positive);
        assert_eq!(classify("Love"), Sentiment::Positive);
        assert_eq!(classify("Anger"), Sentiment::Negative);
        assert_eq!(classify("Tiredness"), Sentiment::Negative);
    }

    #[test]
    fn unknown_and_neutral_labels_classify_neutral() {
        assert_eq!(classify("Calmness"), Sentiment::Neutral);
        assert_eq!(classify("Concentration"), Sentiment::Neutral);
        assert_eq!(classify("NotAnEmotion"), Sentiment::Neutral);
        assert_eq!(classify(""), Sentiment::Neutral);
    }

    #[test]
    fn classify_is_case_sensitive_set_membership() {
        // The model reports capitalized labels; lowercase variants are not
        // members of either set.
        assert_eq!(classify("joy"), Sentiment::Neutral);
    }

    #[test]
    fn sentiment_values_round_trip() {
        for s in [Sentiment::Negative, Sentiment::Neutral, Sentiment::Positive] {
            assert_eq!(Sentiment::from_value(s.value()), Some(s));
        }
        assert_eq!(Sentiment::from_value(2), None);
    }

    #[test]
    fn sentiment_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&Sentiment::Negative).unwrap(), "-1");
        assert_eq!(serde_json::to_string(&Sentiment::Positive).unwrap(), "1");
        let parsed: Sentiment = serde_json::from_str("0").unwrap();
        assert_eq!(parsed, Sentiment::Neutral);
    }
}
