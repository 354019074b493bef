//! Number humanizing
//!
//! Turns numbers into English words, thousands-grouped strings and
//! properly pluralized noun phrases.

use crate::error::{Result, ToolboxError};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, instrument};

const LESS_THAN_20: [&str; 20] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen",
    "nineteen",
];

const TENS: [&str; 10] = [
    "", "ten", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

const SHORT_SCALE: [&str; 7] = [
    "",
    "thousand",
    "million",
    "billion",
    "trillion",
    "quadrillion",
    "quintillion",
];

const BASIC_SCALE: [&str; 4] = ["", "thousand", "million", "billion"];

/// Nouns whose plural does not follow the suffix rules
static IRREGULAR_PLURALS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        // unchanged in the plural
        ("sheep", "sheep"),
        ("fish", "fish"),
        ("deer", "deer"),
        ("moose", "moose"),
        ("series", "series"),
        ("species", "species"),
        ("aircraft", "aircraft"),
        ("offspring", "offspring"),
        ("bison", "bison"),
        ("salmon", "salmon"),
        ("trout", "trout"),
        ("swine", "swine"),
        // vowel changes and old forms
        ("child", "children"),
        ("person", "people"),
        ("man", "men"),
        ("woman", "women"),
        ("mouse", "mice"),
        ("louse", "lice"),
        ("goose", "geese"),
        ("tooth", "teeth"),
        ("foot", "feet"),
        ("ox", "oxen"),
        ("die", "dice"),
        // f / fe -> ves
        ("leaf", "leaves"),
        ("knife", "knives"),
        ("wife", "wives"),
        ("life", "lives"),
        ("half", "halves"),
        ("wolf", "wolves"),
        ("shelf", "shelves"),
        ("calf", "calves"),
        ("loaf", "loaves"),
        ("thief", "thieves"),
        // o -> oes
        ("potato", "potatoes"),
        ("tomato", "tomatoes"),
        ("hero", "heroes"),
        ("echo", "echoes"),
        ("veto", "vetoes"),
        ("torpedo", "torpedoes"),
        // latin and greek
        ("cactus", "cacti"),
        ("fungus", "fungi"),
        ("nucleus", "nuclei"),
        ("criterion", "criteria"),
        ("phenomenon", "phenomena"),
        ("analysis", "analyses"),
        ("crisis", "crises"),
        ("thesis", "theses"),
        ("datum", "data"),
        ("quiz", "quizzes"),
    ]
    .into_iter()
    .collect()
});

/// Word -> value lookup used by [`Humanizer::words_to_number`]
static WORD_VALUES: Lazy<HashMap<&'static str, WordValue>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for (value, word) in LESS_THAN_20.iter().enumerate() {
        map.insert(*word, WordValue::Unit(value as u64));
    }
    for (index, word) in TENS.iter().enumerate().skip(1) {
        map.insert(*word, WordValue::Unit(index as u64 * 10));
    }
    map.insert("hundred", WordValue::Hundred);
    for (index, word) in SHORT_SCALE.iter().enumerate().skip(1) {
        map.insert(*word, WordValue::Scale(index as u32));
    }
    map
});

#[derive(Debug, Clone, Copy)]
enum WordValue {
    Unit(u64),
    Hundred,
    Scale(u32),
}

/// How the fractional part of a float is put into words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DecimalPolicy {
    /// "one point two five"
    #[default]
    DigitByDigit,
    /// Drop the fraction
    Truncate,
    /// Round to the nearest whole number
    Round,
}

/// Which scale names are available for large numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScaleSet {
    /// thousand through quintillion
    #[default]
    Short,
    /// thousand, million and billion only
    Basic,
}

impl ScaleSet {
    /// Scale names, indexed by power of one thousand
    pub const fn names(self) -> &'static [&'static str] {
        match self {
            Self::Short => &SHORT_SCALE,
            Self::Basic => &BASIC_SCALE,
        }
    }

    /// Largest magnitude these names can spell out
    pub fn max_magnitude(self) -> u64 {
        let groups = self.names().len() as u32;
        1000u64.checked_pow(groups).map_or(u64::MAX, |limit| limit - 1)
    }
}

/// Options for the humanizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanizeConfig {
    /// Fraction handling for floats
    pub decimal_policy: DecimalPolicy,
    /// Available scale names
    pub scales: ScaleSet,
    /// Thousands separator used by `commify`
    pub separator: String,
    /// Insert "and" after hundreds ("one hundred and one")
    pub use_and: bool,
    /// Word placed in front of negative numbers
    pub negative_word: String,
}

impl Default for HumanizeConfig {
    fn default() -> Self {
        Self {
            decimal_policy: DecimalPolicy::default(),
            scales: ScaleSet::default(),
            separator: ",".to_string(),
            use_and: true,
            negative_word: "minus".to_string(),
        }
    }
}

impl HumanizeConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.separator.is_empty() {
            return Err(ToolboxError::config("Thousands separator must not be empty"));
        }
        if self.negative_word.trim().is_empty() {
            return Err(ToolboxError::config("Negative word must not be empty"));
        }
        Ok(())
    }
}

/// A number accepted by the humanizer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    /// Whether the value counts as exactly one for pluralization
    pub fn is_one(self) -> bool {
        match self {
            Self::Int(value) => value == 1,
            Self::Float(value) => value == 1.0,
        }
    }

    fn checked(self) -> Result<Self> {
        match self {
            Self::Float(value) if !value.is_finite() => Err(ToolboxError::not_a_number(
                value.to_string(),
                "value is not a finite number",
            )),
            other => Ok(other),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
        }
    }
}

impl FromStr for Number {
    type Err = ToolboxError;

    fn from_str(s: &str) -> Result<Self> {
        let cleaned: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != ',')
            .collect();

        if cleaned.is_empty() {
            return Err(ToolboxError::not_a_number(s, "input is empty"));
        }

        if let Ok(value) = cleaned.parse::<i64>() {
            return Ok(Self::Int(value));
        }

        match cleaned.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Self::Float(value)),
            _ => Err(ToolboxError::not_a_number(
                s,
                "expected an integer or a decimal number",
            )),
        }
    }
}

macro_rules! number_from_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Number {
            fn from(value: $ty) -> Self {
                Self::Int(i64::from(value))
            }
        })*
    };
}

number_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<usize> for Number {
    fn from(value: usize) -> Self {
        i64::try_from(value).map_or(Self::Float(value as f64), Self::Int)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<f32> for Number {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

/// Options for [`Humanizer::count_statement`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountOptions {
    /// Return only the (pluralized) noun
    pub only_noun: bool,
    /// Print the count without thousands separators
    pub skip_commify: bool,
    /// Spell the count out in words
    pub to_words: bool,
    /// Capitalize the first letter of the statement
    pub capitalize: bool,
    /// End the statement with a full stop
    pub full_stop: bool,
}

/// Converts numbers into human-friendly text
#[derive(Debug, Clone, Default)]
pub struct Humanizer {
    config: HumanizeConfig,
}

impl Humanizer {
    /// Create a humanizer with the given options
    pub fn new(config: HumanizeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active configuration
    pub const fn config(&self) -> &HumanizeConfig {
        &self.config
    }

    /// Spell a number out in English words
    #[instrument(skip(self, number))]
    pub fn to_words(&self, number: impl Into<Number>) -> Result<String> {
        let number = number.into().checked()?;
        let words = match number {
            Number::Int(value) => self.int_to_words(value)?,
            Number::Float(value) => self.float_to_words(value)?,
        };
        debug!("{} -> {}", number, words);
        Ok(words)
    }

    /// Parse text as a number and spell it out
    pub fn text_to_words(&self, text: &str) -> Result<String> {
        self.to_words(text.parse::<Number>()?)
    }

    /// The number as a plain string, unmodified
    pub fn to_str(&self, number: impl Into<Number>) -> String {
        number.into().to_string()
    }

    /// The number with its integer part grouped by thousands
    pub fn commify(&self, number: impl Into<Number>) -> Result<String> {
        let text = number.into().checked()?.to_string();
        let (sign, body) = text
            .strip_prefix('-')
            .map_or(("", text.as_str()), |rest| ("-", rest));
        let (whole, fraction) = body
            .split_once('.')
            .map_or((body, None), |(whole, fraction)| (whole, Some(fraction)));

        let mut grouped = String::with_capacity(text.len() + whole.len() / 3);
        for (i, digit) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push_str(&self.config.separator);
            }
            grouped.push(digit);
        }

        Ok(match fraction {
            Some(fraction) => format!("{sign}{grouped}.{fraction}"),
            None => format!("{sign}{grouped}"),
        })
    }

    /// The noun, pluralized unless the count is exactly one
    pub fn count_noun(&self, noun: &str, count: impl Into<Number>) -> Result<String> {
        let noun = noun.trim();
        if noun.is_empty() {
            return Err(ToolboxError::validation("Noun must not be empty"));
        }

        let count = count.into().checked()?;
        if count.is_one() {
            Ok(noun.to_string())
        } else {
            Ok(pluralize(noun))
        }
    }

    /// A full count statement such as "1,234 boxes" or "Three sheep."
    pub fn count_statement(
        &self,
        noun: &str,
        count: impl Into<Number>,
        options: &CountOptions,
    ) -> Result<String> {
        let count = count.into();
        let noun = self.count_noun(noun, count)?;

        let mut statement = if options.only_noun {
            noun
        } else {
            let count_text = if options.to_words {
                self.to_words(count)?
            } else if options.skip_commify {
                self.to_str(count)
            } else {
                self.commify(count)?
            };
            format!("{count_text} {noun}")
        };

        if options.capitalize {
            statement = capitalize_first(&statement);
        }
        if options.full_stop {
            statement.push('.');
        }
        Ok(statement)
    }

    /// Parse words produced by [`Humanizer::to_words`] back into an integer
    pub fn words_to_number(&self, words: &str) -> Result<i64> {
        let normalized = words.to_lowercase().replace([',', '-'], " ");
        let mut tokens = normalized.split_whitespace().peekable();

        let negative = tokens.next_if_eq(&self.config.negative_word.as_str()).is_some();

        let mut total: u64 = 0;
        let mut current: u64 = 0;
        let mut seen_any = false;

        for token in tokens {
            if token == "and" {
                continue;
            }
            let value = WORD_VALUES
                .get(token)
                .ok_or_else(|| ToolboxError::not_a_number(words, format!("unknown word '{token}'")))?;
            seen_any = true;

            match *value {
                WordValue::Unit(unit) => current += unit,
                WordValue::Hundred => {
                    if current == 0 {
                        return Err(ToolboxError::not_a_number(words, "'hundred' without a multiplier"));
                    }
                    current = current
                        .checked_mul(100)
                        .ok_or_else(|| ToolboxError::number_too_large(words, i64::MAX))?;
                }
                WordValue::Scale(power) => {
                    let scaled = 1000u64
                        .checked_pow(power)
                        .and_then(|scale| current.checked_mul(scale))
                        .and_then(|scaled| total.checked_add(scaled))
                        .ok_or_else(|| ToolboxError::number_too_large(words, i64::MAX))?;
                    total = scaled;
                    current = 0;
                }
            }
        }

        if !seen_any {
            return Err(ToolboxError::not_a_number(words, "no number words found"));
        }

        let magnitude = total
            .checked_add(current)
            .ok_or_else(|| ToolboxError::number_too_large(words, i64::MAX))?;
        let signed = if negative {
            0i64.checked_sub_unsigned(magnitude)
        } else {
            i64::try_from(magnitude).ok()
        };
        signed.ok_or_else(|| ToolboxError::number_too_large(words, i64::MAX))
    }

    fn int_to_words(&self, value: i64) -> Result<String> {
        let words = self.magnitude_to_words(value.unsigned_abs())?;
        Ok(self.with_sign(value < 0, words))
    }

    fn float_to_words(&self, value: f64) -> Result<String> {
        match self.config.decimal_policy {
            DecimalPolicy::Truncate => self.int_to_words(self.float_to_int(value.trunc())?),
            DecimalPolicy::Round => self.int_to_words(self.float_to_int(value.round())?),
            DecimalPolicy::DigitByDigit => {
                let text = value.abs().to_string();
                let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));
                let whole: u64 = whole.parse().map_err(|_| {
                    ToolboxError::number_too_large(value, self.config.scales.max_magnitude())
                })?;

                let mut words = self.magnitude_to_words(whole)?;
                if !fraction.is_empty() {
                    words.push_str(" point");
                    for digit in fraction.chars().filter_map(|c| c.to_digit(10)) {
                        words.push(' ');
                        words.push_str(LESS_THAN_20[digit as usize]);
                    }
                }
                Ok(self.with_sign(value < 0.0, words))
            }
        }
    }

    fn float_to_int(&self, value: f64) -> Result<i64> {
        if value >= i64::MIN as f64 && value < i64::MAX as f64 {
            Ok(value as i64)
        } else {
            Err(ToolboxError::number_too_large(
                value,
                self.config.scales.max_magnitude(),
            ))
        }
    }

    fn with_sign(&self, negative: bool, words: String) -> String {
        if negative {
            format!("{} {}", self.config.negative_word, words)
        } else {
            words
        }
    }

    fn magnitude_to_words(&self, value: u64) -> Result<String> {
        if value == 0 {
            return Ok(LESS_THAN_20[0].to_string());
        }

        let scales = self.config.scales;
        if value > scales.max_magnitude() {
            return Err(ToolboxError::number_too_large(value, scales.max_magnitude()));
        }

        // (power of one thousand, three-digit group), most significant first
        let mut groups = Vec::new();
        let mut rest = value;
        let mut power = 0;
        while rest > 0 {
            let group = (rest % 1000) as usize;
            if group != 0 {
                groups.push((power, group));
            }
            rest /= 1000;
            power += 1;
        }
        groups.reverse();

        let last = groups.len() - 1;
        let mut words = String::new();
        for (position, (power, group)) in groups.into_iter().enumerate() {
            if position > 0 {
                let trailing_small = position == last && power == 0 && group < 100;
                words.push_str(if trailing_small && self.config.use_and {
                    " and "
                } else {
                    ", "
                });
            }
            words.push_str(&self.group_to_words(group));
            if power > 0 {
                words.push(' ');
                words.push_str(scales.names()[power]);
            }
        }
        Ok(words)
    }

    fn group_to_words(&self, group: usize) -> String {
        let hundreds = group / 100;
        let rest = group % 100;

        let mut words = String::new();
        if hundreds > 0 {
            words.push_str(LESS_THAN_20[hundreds]);
            words.push_str(" hundred");
        }
        if rest > 0 {
            if hundreds > 0 {
                words.push_str(if self.config.use_and { " and " } else { " " });
            }
            words.push_str(&below_hundred(rest));
        }
        words
    }
}

fn below_hundred(value: usize) -> String {
    if value < 20 {
        LESS_THAN_20[value].to_string()
    } else if value % 10 == 0 {
        TENS[value / 10].to_string()
    } else {
        format!("{}-{}", TENS[value / 10], LESS_THAN_20[value % 10])
    }
}

/// Pluralize the last word of a noun phrase, keeping its letter case
fn pluralize(noun: &str) -> String {
    let (head, word) = match noun.rsplit_once(' ') {
        Some((head, word)) => (Some(head), word),
        None => (None, noun),
    };

    let lower = word.to_lowercase();
    let shouting = word.len() > 1
        && word.chars().any(char::is_alphabetic)
        && word == word.to_uppercase();

    let plural = match IRREGULAR_PLURALS.get(lower.as_str()) {
        Some(irregular) if shouting => irregular.to_uppercase(),
        Some(irregular) if word.chars().next().is_some_and(char::is_uppercase) => {
            capitalize_first(irregular)
        }
        Some(irregular) => (*irregular).to_string(),
        None => {
            let (drop, suffix) = regular_suffix(&lower);
            let stem = &word[..word.len() - drop];
            if shouting {
                format!("{stem}{}", suffix.to_uppercase())
            } else {
                format!("{stem}{suffix}")
            }
        }
    };

    match head {
        Some(head) => format!("{head} {plural}"),
        None => plural,
    }
}

/// Bytes to drop from the end of the word and the suffix to append
fn regular_suffix(lower: &str) -> (usize, &'static str) {
    if ["s", "x", "z", "ch", "sh"].iter().any(|suffix| lower.ends_with(suffix)) {
        return (0, "es");
    }

    let mut chars = lower.chars().rev();
    if let (Some('y'), Some(before)) = (chars.next(), chars.next()) {
        if !"aeiou".contains(before) {
            return (1, "ies");
        }
    }

    (0, "s")
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Spell a number out using the default options
pub fn to_words(number: impl Into<Number>) -> Result<String> {
    Humanizer::default().to_words(number)
}

/// Group a number by thousands using the default options
pub fn commify(number: impl Into<Number>) -> Result<String> {
    Humanizer::default().commify(number)
}

/// "3 processes", "1 box": count and noun using the default options
pub fn describe_count(noun: &str, count: impl Into<Number>) -> Result<String> {
    Humanizer::default().count_statement(noun, count, &CountOptions::default())
}

/// Pluralize a noun for a count using the default options
pub fn count_noun(noun: &str, count: impl Into<Number>) -> Result<String> {
    Humanizer::default().count_noun(noun, count)
}
