use crate::parse::Parser;
use crate::utils::parse_date;
pub use chrono::NaiveDate as Date;
use getset::Getters;
#[cfg(feature = "serde")]
use serde::{ser::SerializeMap, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::convert::From;
use std::fmt;
use std::fs;
use std::str::FromStr;
use std::sync::Arc;

/// Representing a location, line number and column number, in a source file.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Location {
    pub line: usize,
    pub col: usize,
}

impl Location {
    pub fn advance(&self, width: usize) -> Self {
        Location {
            col: self.col + width,
            line: self.line,
        }
    }
}

impl From<(usize, usize)> for Location {
    fn from(tuple: (usize, usize)) -> Self {
        Location {
            line: tuple.0,
            col: tuple.1,
        }
    }
}

/// A string wrapped in [`Arc`](std::sync::Arc)
/// representing the source file path.
pub type SrcFile = Arc<String>;

/// File name used for text that did not come from a file.
pub const ANONYMOUS_SRC: &str = "<input>";

/// Represents a range in a source file. This struct is used to track the origins
/// of records in the generated [`Gedcom`], as well as for locating errors.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Source {
    pub file: SrcFile,
    pub start: Location,
    pub end: Location,
}

impl Source {
    pub(crate) fn start_of(file: SrcFile) -> Self {
        Source {
            file,
            start: (1, 1).into(),
            end: (1, 1).into(),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.start.line, self.start.col)
    }
}

/// Kinds of errors that `gedcom` encountered while turning input text into a
/// [`Gedcom`].
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// IO error, e.g., the content of an input file cannot be read as text.
    Io,
    /// A line cannot be split into a level and a tag, or the input contains no
    /// well-formed line at all.
    Syntax,
    /// The resolved model failed a shape check.
    Validation,
    /// The same record identifier is declared more than once.
    Duplicate,
}

/// The level of an error. Only [`ErrorLevel::Error`] aborts a parse; the
/// others are diagnostics returned alongside the model.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorLevel {
    Info,
    Warning,
    Error,
}

/// Contains the full information of an error.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Error {
    pub msg: String,
    pub src: Source,
    pub r#type: ErrorType,
    pub level: ErrorLevel,
}

impl Error {
    /// Wraps an I/O failure while reading `path`.
    pub fn io(path: &str, io_error: &std::io::Error) -> Self {
        Error {
            msg: format!("Couldn't read {}: {}", path, io_error),
            src: Source::start_of(Arc::new(path.to_string())),
            r#type: ErrorType::Io,
            level: ErrorLevel::Error,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}: {}\n  {}:{}:{}",
            self.level, self.msg, self.src.file, self.src.start.line, self.src.start.col
        )
    }
}

impl std::error::Error for Error {}

/// A GEDCOM cross-reference identifier such as `@I1@`, shared between all
/// records that point at it.
pub type Xref = Arc<str>;

/// The value of one tag on a record: either a plain string, or a structure
/// such as `BIRT` holding its `DATE`, `PLAC`, `CAUS` and `TIME` details.
#[cfg_attr(feature = "serde", derive(Serialize), serde(untagged))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Value(String),
    Structure(BTreeMap<String, String>),
}

impl Field {
    pub fn as_value(&self) -> Option<&str> {
        match self {
            Field::Value(value) => Some(value),
            Field::Structure(_) => None,
        }
    }

    pub fn as_structure(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Field::Value(_) => None,
            Field::Structure(details) => Some(details),
        }
    }

    /// Returns a detail of a structure, e.g. `DATE` of a `BIRT` field.
    pub fn detail(&self, tag: &str) -> Option<&str> {
        self.as_structure()
            .and_then(|details| details.get(tag))
            .map(String::as_str)
    }
}

/// Tags of a record mapped to their values.
pub type Fields = BTreeMap<String, Field>;

/// Links from an [`Individual`] to its relatives.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default, Getters)]
pub struct Relationships {
    /// Returns the father, if one was resolved.
    #[getset(get = "pub")]
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub(crate) father: Option<Xref>,

    /// Returns the mother, if one was resolved.
    #[getset(get = "pub")]
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub(crate) mother: Option<Xref>,

    /// Returns the spouse, if one was resolved.
    #[getset(get = "pub")]
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub(crate) spouse: Option<Xref>,

    /// Returns the children, without duplicates, in the order they were linked.
    #[getset(get = "pub")]
    pub(crate) children: Vec<Xref>,
}

/// Links from a [`Family`] to its members. Any of them may be missing.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default, Getters)]
pub struct FamilyRelationships {
    #[getset(get = "pub")]
    pub(crate) husband: Option<Xref>,

    #[getset(get = "pub")]
    pub(crate) wife: Option<Xref>,

    #[getset(get = "pub")]
    pub(crate) children: Vec<Xref>,
}

/// A person record, started by a `0 @I..@ INDI` line.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct Individual {
    /// Returns the identifier, e.g. `@I1@`.
    #[getset(get = "pub")]
    pub(crate) id: Xref,

    /// Returns all tags of the record.
    #[getset(get = "pub")]
    pub(crate) fields: Fields,

    /// Returns the resolved relatives.
    #[getset(get = "pub")]
    pub(crate) relationships: Relationships,

    /// Returns the source of the record header.
    #[getset(get = "pub")]
    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) src: Source,
}

impl Individual {
    pub(crate) fn new(id: Xref, src: Source) -> Self {
        Individual {
            id,
            fields: Fields::new(),
            relationships: Relationships::default(),
            src,
        }
    }

    pub fn field(&self, tag: &str) -> Option<&Field> {
        self.fields.get(tag)
    }

    /// Returns the `NAME` value, e.g. `John /Doe/`.
    pub fn name(&self) -> Option<&str> {
        self.field("NAME").and_then(Field::as_value)
    }

    pub fn birth_date(&self) -> Option<Date> {
        self.field("BIRT")
            .and_then(|birth| birth.detail("DATE"))
            .and_then(parse_date)
    }

    pub fn death_date(&self) -> Option<Date> {
        self.field("DEAT")
            .and_then(|death| death.detail("DATE"))
            .and_then(parse_date)
    }
}

/// A family unit record, started by a `0 @F..@ FAM` line.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct Family {
    #[getset(get = "pub")]
    pub(crate) id: Xref,

    /// Returns the tags of the record other than `HUSB`, `WIFE` and `CHIL`,
    /// e.g. `MARR`.
    #[getset(get = "pub")]
    pub(crate) fields: Fields,

    #[getset(get = "pub")]
    pub(crate) relationships: FamilyRelationships,

    #[getset(get = "pub")]
    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) src: Source,
}

impl Family {
    pub(crate) fn new(id: Xref, src: Source) -> Self {
        Family {
            id,
            fields: Fields::new(),
            relationships: FamilyRelationships::default(),
            src,
        }
    }

    pub fn field(&self, tag: &str) -> Option<&Field> {
        self.fields.get(tag)
    }
}

/// Common view of the two record kinds, used for keying and validation.
pub(crate) trait Record {
    const KIND: &'static str;

    fn xref(&self) -> &Xref;

    fn src(&self) -> &Source;
}

impl Record for Individual {
    const KIND: &'static str = "individual";

    fn xref(&self) -> &Xref {
        &self.id
    }

    fn src(&self) -> &Source {
        &self.src
    }
}

impl Record for Family {
    const KIND: &'static str = "family";

    fn xref(&self) -> &Xref {
        &self.id
    }

    fn src(&self) -> &Source {
        &self.src
    }
}

pub(crate) fn index_records<R: Record>(records: &[R]) -> HashMap<Xref, usize> {
    records
        .iter()
        .enumerate()
        .map(|(position, record)| (record.xref().clone(), position))
        .collect()
}

/// Represents a parsed GEDCOM file: all individuals and families, with
/// parent, child and spouse links resolved.
///
/// A `Gedcom` is only handed out after resolution and validation, and cannot
/// be modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gedcom {
    pub(crate) individuals: Vec<Individual>,
    pub(crate) families: Vec<Family>,
    pub(crate) individual_index: HashMap<Xref, usize>,
    pub(crate) family_index: HashMap<Xref, usize>,
}

impl Gedcom {
    pub(crate) fn new(individuals: Vec<Individual>, families: Vec<Family>) -> Self {
        let individual_index = index_records(&individuals);
        let family_index = index_records(&families);
        Gedcom {
            individuals,
            families,
            individual_index,
            family_index,
        }
    }

    /// Parses GEDCOM text into a resolved and validated model.
    pub fn parse(text: &str) -> Result<Self, Error> {
        Self::parse_with_diagnostics(text, ANONYMOUS_SRC).map(|(gedcom, _)| gedcom)
    }

    /// Parses GEDCOM text read from `file`, returning the model together with
    /// the non-fatal diagnostics, such as skipped malformed lines.
    pub fn parse_with_diagnostics(text: &str, file: &str) -> Result<(Self, Vec<Error>), Error> {
        let (draft, errors) = Parser::parse(text, Arc::new(file.to_string()))?;
        let gedcom = draft.into_gedcom();
        gedcom.validate()?;
        log::info!(
            "Parsed {}: {} individuals, {} families, {} diagnostics",
            file,
            gedcom.individuals.len(),
            gedcom.families.len(),
            errors.len()
        );
        Ok((gedcom, errors))
    }

    pub fn from_file(path: &str) -> Result<Self, Error> {
        let data = fs::read_to_string(path).map_err(|io_error| Error::io(path, &io_error))?;
        Self::parse_with_diagnostics(&data, path).map(|(gedcom, _)| gedcom)
    }

    /// Returns the individuals in the order they appear in the source.
    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    /// Returns the families in the order they appear in the source. Families
    /// merged into an earlier one are not included.
    pub fn families(&self) -> &[Family] {
        &self.families
    }

    pub fn individual(&self, id: &str) -> Option<&Individual> {
        self.individual_index
            .get(id)
            .map(|&position| &self.individuals[position])
    }

    pub fn family(&self, id: &str) -> Option<&Family> {
        self.family_index
            .get(id)
            .map(|&position| &self.families[position])
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty() && self.families.is_empty()
    }
}

impl FromStr for Gedcom {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(feature = "serde")]
struct KeyedRecords<'a, R>(&'a [R]);

#[cfg(feature = "serde")]
impl<'a, R: Record + Serialize> Serialize for KeyedRecords<'a, R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for record in self.0 {
            map.serialize_entry(record.xref(), record)?;
        }
        map.end()
    }
}

/// Serializes as `{"individuals": {id: record}, "families": {id: record}}`.
#[cfg(feature = "serde")]
impl Serialize for Gedcom {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("individuals", &KeyedRecords(&self.individuals))?;
        map.serialize_entry("families", &KeyedRecords(&self.families))?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "0 HEAD\n\
                          1 GEDC\n\
                          2 VERS 5.5.1\n\
                          0 @I1@ INDI\n\
                          1 NAME John /Doe/\n\
                          1 SEX M\n\
                          1 BIRT\n\
                          2 DATE 01 JAN 1900\n\
                          0 TRLR\n";

    #[test]
    fn parses_the_upload_sample() {
        let gedcom = Gedcom::parse(SAMPLE).unwrap();
        let john = gedcom.individual("@I1@").unwrap();
        assert_eq!(john.name(), Some("John /Doe/"));
        assert_eq!(john.birth_date(), Date::from_ymd_opt(1900, 1, 1));
        assert_eq!(john.death_date(), None);
        assert!(gedcom.family("@I1@").is_none());
    }

    #[test]
    fn from_str_matches_parse() {
        let gedcom: Gedcom = SAMPLE.parse().unwrap();
        assert_eq!(gedcom, Gedcom::parse(SAMPLE).unwrap());
    }

    #[test]
    fn io_errors_name_the_path() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error = Error::io("tree.ged", &io_error);
        assert_eq!(error.r#type, ErrorType::Io);
        assert_eq!(error.level, ErrorLevel::Error);
        assert_eq!(error.to_string(), "Error: Couldn't read tree.ged: missing\n  tree.ged:1:1");
    }

    #[test]
    fn field_accessors() {
        let mut details = BTreeMap::new();
        details.insert("PLAC".to_string(), "Boston".to_string());
        let structure = Field::Structure(details);
        assert_eq!(structure.detail("PLAC"), Some("Boston"));
        assert_eq!(structure.as_value(), None);
        assert_eq!(Field::Value("M".to_string()).as_value(), Some("M"));
        assert_eq!(Field::Value("M".to_string()).detail("PLAC"), None);
    }
}
