use super::lexer::{Lexer, Line};
use crate::model::Record;
use crate::{
    Error, ErrorLevel, ErrorType, Family, Field, Fields, Gedcom, Individual, Source, SrcFile, Xref,
};

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
    sync::Arc,
};

/// Tags that open a structure; their details are nested under them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTag {
    Birth,
    Christening,
    Death,
    Burial,
    Marriage,
    Divorce,
    Change,
}

impl EventTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventTag::Birth => "BIRT",
            EventTag::Christening => "CHR",
            EventTag::Death => "DEAT",
            EventTag::Burial => "BURI",
            EventTag::Marriage => "MARR",
            EventTag::Divorce => "DIV",
            EventTag::Change => "CHAN",
        }
    }
}

/// Tags that describe the enclosing [`EventTag`] structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetailTag {
    Date,
    Place,
    Cause,
    Time,
}

impl DetailTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetailTag::Date => "DATE",
            DetailTag::Place => "PLAC",
            DetailTag::Cause => "CAUS",
            DetailTag::Time => "TIME",
        }
    }
}

/// A tag of a line below level 0, classified for the record builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag<'a> {
    Event(EventTag),
    Detail(DetailTag),
    /// `CHIL`
    Child,
    /// `HUSB`
    Husband,
    /// `WIFE`
    Wife,
    /// `CONC`, continuation on the same line.
    Concat,
    /// `CONT`, continuation on a new line.
    Continue,
    /// Any other tag, stored verbatim.
    Other(&'a str),
}

impl<'a> From<&'a str> for Tag<'a> {
    fn from(tag: &'a str) -> Self {
        match tag {
            "BIRT" => Tag::Event(EventTag::Birth),
            "CHR" => Tag::Event(EventTag::Christening),
            "DEAT" => Tag::Event(EventTag::Death),
            "BURI" => Tag::Event(EventTag::Burial),
            "MARR" => Tag::Event(EventTag::Marriage),
            "DIV" => Tag::Event(EventTag::Divorce),
            "CHAN" => Tag::Event(EventTag::Change),
            "DATE" => Tag::Detail(DetailTag::Date),
            "PLAC" => Tag::Detail(DetailTag::Place),
            "CAUS" => Tag::Detail(DetailTag::Cause),
            "TIME" => Tag::Detail(DetailTag::Time),
            "CHIL" => Tag::Child,
            "HUSB" => Tag::Husband,
            "WIFE" => Tag::Wife,
            "CONC" => Tag::Concat,
            "CONT" => Tag::Continue,
            other => Tag::Other(other),
        }
    }
}

impl<'a> fmt::Display for Tag<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Tag::Event(event) => event.as_str(),
            Tag::Detail(detail) => detail.as_str(),
            Tag::Child => "CHIL",
            Tag::Husband => "HUSB",
            Tag::Wife => "WIFE",
            Tag::Concat => "CONC",
            Tag::Continue => "CONT",
            Tag::Other(other) => other,
        };
        write!(f, "{}", text)
    }
}

/// Records collected by the [`Parser`], in source order, before relationships
/// are resolved.
#[derive(Debug, Default)]
pub struct GedcomDraft {
    pub individuals: Vec<Individual>,
    pub families: Vec<Family>,
    individual_index: HashMap<Xref, usize>,
    family_index: HashMap<Xref, usize>,
}

fn add_record<R: Record>(
    records: &mut Vec<R>,
    index: &mut HashMap<Xref, usize>,
    record: R,
) -> Result<(), Error> {
    if let Some(&position) = index.get(record.xref()) {
        let error = Error {
            level: ErrorLevel::Warning,
            r#type: ErrorType::Duplicate,
            msg: format!(
                "Replaced {} {}: it has been defined at {}.",
                R::KIND,
                record.xref(),
                records[position].src()
            ),
            src: record.src().clone(),
        };
        records[position] = record;
        Err(error)
    } else {
        index.insert(record.xref().clone(), records.len());
        records.push(record);
        Ok(())
    }
}

impl GedcomDraft {
    pub fn add_individual(&mut self, individual: Individual) -> Result<(), Error> {
        add_record(
            &mut self.individuals,
            &mut self.individual_index,
            individual,
        )
    }

    pub fn add_family(&mut self, family: Family) -> Result<(), Error> {
        add_record(&mut self.families, &mut self.family_index, family)
    }

    /// Resolves relationships between the drafted records.
    pub fn into_gedcom(self) -> Gedcom {
        let mut gedcom = Gedcom::new(self.individuals, self.families);
        gedcom.resolve();
        gedcom
    }
}

enum Entity {
    Individual(Individual),
    Family(Family),
}

impl Entity {
    fn fields_mut(&mut self) -> &mut Fields {
        match self {
            Entity::Individual(individual) => &mut individual.fields,
            Entity::Family(family) => &mut family.fields,
        }
    }
}

/// The value that a following `CONC` or `CONT` line extends.
#[derive(Debug, Clone, Copy)]
enum Target<'source> {
    Field(&'source str),
    Detail(EventTag, DetailTag),
}

/// Builder state of the level-0 record being parsed.
struct RecordState<'source> {
    entity: Entity,
    /// The open event structure and the level of its line.
    event: Option<(EventTag, usize)>,
    target: Option<Target<'source>>,
}

fn is_pointer(tag: &str, prefix: &str) -> bool {
    tag.len() > prefix.len() + 1 && tag.starts_with(prefix) && tag.ends_with('@')
}

fn extend_value(fields: &mut Fields, target: Option<Target>, separator: char, value: &str) -> bool {
    let existing = match target {
        Some(Target::Field(tag)) => match fields.get_mut(tag) {
            Some(Field::Value(existing)) => existing,
            _ => return false,
        },
        Some(Target::Detail(event, detail)) => match fields.get_mut(event.as_str()) {
            Some(Field::Structure(details)) => match details.get_mut(detail.as_str()) {
                Some(existing) => existing,
                None => return false,
            },
            _ => return false,
        },
        None => return false,
    };
    existing.push(separator);
    existing.push_str(value);
    true
}

pub struct Parser<'source> {
    lexer: Lexer<'source>,
    file: SrcFile,
    xrefs: HashSet<Xref>,
}

impl<'source> Parser<'source> {
    fn xref(&mut self, id: &str) -> Xref {
        if let Some(xref) = self.xrefs.get(id) {
            return xref.clone();
        }
        let xref: Xref = Arc::from(id);
        self.xrefs.insert(xref.clone());
        xref
    }

    fn pointer_value(&mut self, line: &Line) -> Option<Xref> {
        if line.value.is_empty() {
            log::debug!("Ignored empty {} at {}", line.tag, line.src);
            None
        } else {
            Some(self.xref(&line.value))
        }
    }

    fn open_record(&mut self, line: &Line<'source>) -> Option<RecordState<'source>> {
        let entity = if is_pointer(line.tag, "@I") {
            Entity::Individual(Individual::new(self.xref(line.tag), line.src.clone()))
        } else if is_pointer(line.tag, "@F") {
            Entity::Family(Family::new(self.xref(line.tag), line.src.clone()))
        } else {
            log::trace!("Skipped record {} at {}", line.tag, line.src);
            return None;
        };
        Some(RecordState {
            entity,
            event: None,
            target: None,
        })
    }

    fn close_record(record: RecordState, draft: &mut GedcomDraft, errors: &mut Vec<Error>) {
        let r = match record.entity {
            Entity::Individual(individual) => draft.add_individual(individual),
            Entity::Family(family) => draft.add_family(family),
        };
        if let Err(err) = r {
            log::warn!("{}", err);
            errors.push(err);
        }
    }

    fn parse_sub_tag(&mut self, record: &mut RecordState<'source>, line: Line<'source>) {
        if let Some((_, event_level)) = record.event {
            if line.level <= event_level {
                record.event = None;
            }
        }
        let tag = Tag::from(line.tag);
        match (tag, &mut record.entity) {
            (Tag::Event(event), entity) => {
                entity
                    .fields_mut()
                    .entry(event.as_str().to_string())
                    .or_insert_with(|| Field::Structure(BTreeMap::new()));
                record.event = Some((event, line.level));
            }
            (Tag::Detail(detail), entity) => match record.event {
                Some((event, _)) => {
                    if let Some(Field::Structure(details)) =
                        entity.fields_mut().get_mut(event.as_str())
                    {
                        details.insert(detail.as_str().to_string(), line.value);
                        record.target = Some(Target::Detail(event, detail));
                    }
                }
                None => log::debug!("Dropped {} outside of an event at {}", tag, line.src),
            },
            (Tag::Child, Entity::Family(family)) => {
                if let Some(child) = self.pointer_value(&line) {
                    if !family.relationships.children.contains(&child) {
                        family.relationships.children.push(child);
                    }
                }
            }
            (Tag::Husband, Entity::Family(family)) => {
                family.relationships.husband = self.pointer_value(&line);
            }
            (Tag::Wife, Entity::Family(family)) => {
                family.relationships.wife = self.pointer_value(&line);
            }
            (Tag::Concat, entity) => {
                if !extend_value(entity.fields_mut(), record.target, ' ', &line.value) {
                    log::debug!("Dropped CONC without a value to extend at {}", line.src);
                }
            }
            (Tag::Continue, entity) => {
                if !extend_value(entity.fields_mut(), record.target, '\n', &line.value) {
                    log::debug!("Dropped CONT without a value to extend at {}", line.src);
                }
            }
            // Family pointers on an individual are kept like any other tag.
            (Tag::Child | Tag::Husband | Tag::Wife | Tag::Other(_), entity) => {
                entity
                    .fields_mut()
                    .insert(line.tag.to_string(), Field::Value(line.value));
                record.target = Some(Target::Field(line.tag));
            }
        }
    }

    /// Returns the number of well-formed lines.
    fn parse_records(&mut self, draft: &mut GedcomDraft, errors: &mut Vec<Error>) -> usize {
        let mut current: Option<RecordState<'source>> = None;
        let mut well_formed = 0;
        while let Some(line) = self.lexer.next() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    log::warn!("{}", err);
                    errors.push(err);
                    continue;
                }
            };
            well_formed += 1;
            if line.level == 0 {
                if let Some(record) = current.take() {
                    Self::close_record(record, draft, errors);
                }
                current = self.open_record(&line);
            } else if let Some(record) = current.as_mut() {
                self.parse_sub_tag(record, line);
            }
        }
        if let Some(record) = current.take() {
            Self::close_record(record, draft, errors);
        }
        well_formed
    }

    /// Builds the records of `text`. Malformed lines and duplicate records are
    /// returned as warnings; the parse only fails if `text` has no well-formed
    /// line at all.
    pub fn parse(text: &'source str, file: SrcFile) -> Result<(GedcomDraft, Vec<Error>), Error> {
        let mut parser = Parser {
            lexer: Lexer::new(text, file.clone()),
            file,
            xrefs: HashSet::new(),
        };
        let mut draft = GedcomDraft::default();
        let mut errors = Vec::new();
        let well_formed = parser.parse_records(&mut draft, &mut errors);
        if well_formed == 0 {
            return Err(Error {
                msg: "No GEDCOM lines found: expect lines like `<level> <tag> [<value>]`."
                    .to_string(),
                src: Source::start_of(parser.file.clone()),
                r#type: ErrorType::Syntax,
                level: ErrorLevel::Error,
            });
        }
        Ok((draft, errors))
    }
}
