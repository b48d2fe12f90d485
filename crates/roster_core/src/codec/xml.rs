//! Student markup codec.
//!
//! Format:
//!
//! ```text
//! <students>
//!   <student>
//!     <fio>...</fio>
//!     <group>...</group>
//!     <exams>
//!       <exam subject="...">
//!         <grade>...</grade>
//!       </exam>
//!     </exams>
//!   </student>
//! </students>
//! ```
//!
//! # Invariants
//! - Import buffers the whole file before writing; a parse error persists
//!   nothing.
//! - Imported students bypass create-path validation.

use crate::codec::{CodecError, CodecResult};
use crate::model::student::{Exams, NewStudent, Student};
use crate::repo::student_repo::StudentRepository;
use log::{error, info};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

const TAG_STUDENTS: &str = "students";
const TAG_STUDENT: &str = "student";
const TAG_FIO: &str = "fio";
const TAG_GROUP: &str = "group";
const TAG_EXAMS: &str = "exams";
const TAG_EXAM: &str = "exam";
const TAG_GRADE: &str = "grade";
const ATTR_SUBJECT: &str = "subject";

/// Writes every student in the store to `path`. Returns the exported count.
pub fn export_markup<R: StudentRepository>(
    repo: &R,
    path: impl AsRef<Path>,
) -> CodecResult<usize> {
    let started_at = Instant::now();
    let students = repo.get_all()?;
    let file = File::create(path.as_ref())?;
    write_students(BufWriter::new(file), &students)?;

    info!(
        "event=markup_export module=codec status=ok count={} duration_ms={}",
        students.len(),
        started_at.elapsed().as_millis()
    );
    Ok(students.len())
}

/// Parses `path` and adds every student in one batch. Returns the count.
pub fn import_markup<R: StudentRepository>(
    repo: &mut R,
    path: impl AsRef<Path>,
) -> CodecResult<usize> {
    let started_at = Instant::now();
    let result = parse_and_store(repo, path.as_ref());

    match &result {
        Ok(count) => info!(
            "event=markup_import module=codec status=ok count={count} duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=markup_import module=codec status=error duration_ms={} error_code={} position={}",
            started_at.elapsed().as_millis(),
            err.code(),
            err.position().map_or_else(|| "none".to_string(), |position| position.to_string())
        ),
    }
    result
}

fn parse_and_store<R: StudentRepository>(repo: &mut R, path: &Path) -> CodecResult<usize> {
    let file = File::open(path)?;
    let students = parse_students(BufReader::new(file))?;
    Ok(repo.add_batch(&students)?.len())
}

/// Serializes `students` as indented UTF-8 markup.
pub fn write_students<W: Write>(sink: W, students: &[Student]) -> CodecResult<()> {
    let mut writer = Writer::new_with_indent(sink, b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new(TAG_STUDENTS)))?;

    for student in students {
        writer.write_event(Event::Start(BytesStart::new(TAG_STUDENT)))?;
        write_text_element(&mut writer, TAG_FIO, &student.fio)?;
        write_text_element(&mut writer, TAG_GROUP, &student.group)?;

        writer.write_event(Event::Start(BytesStart::new(TAG_EXAMS)))?;
        for (subject, grade) in &student.exams {
            let exam = BytesStart::new(TAG_EXAM).with_attributes([(ATTR_SUBJECT, subject.as_str())]);
            writer.write_event(Event::Start(exam))?;
            write_text_element(&mut writer, TAG_GRADE, &grade.to_string())?;
            writer.write_event(Event::End(BytesEnd::new(TAG_EXAM)))?;
        }
        writer.write_event(Event::End(BytesEnd::new(TAG_EXAMS)))?;

        writer.write_event(Event::End(BytesEnd::new(TAG_STUDENT)))?;
    }

    writer.write_event(Event::End(BytesEnd::new(TAG_STUDENTS)))?;

    let mut sink = writer.into_inner();
    sink.write_all(b"\n")?;
    sink.flush()?;
    Ok(())
}

/// Parses student markup into create candidates.
///
/// Fails on any structural deviation; never returns a partial list.
pub fn parse_students<B: BufRead>(source: B) -> CodecResult<Vec<NewStudent>> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text(true);

    let mut parser = MarkupParser::default();
    let mut buf = Vec::new();
    loop {
        let position = reader.buffer_position() as u64;
        match reader.read_event_into(&mut buf)? {
            Event::Start(element) => parser.open(&element, position)?,
            Event::Empty(element) => {
                parser.open(&element, position)?;
                parser.close(&local_name(&element), position)?;
            }
            Event::End(element) => {
                let name = String::from_utf8_lossy(element.local_name().as_ref()).into_owned();
                parser.close(&name, position)?;
            }
            Event::Text(text) => parser.text(&text.unescape()?, position)?,
            Event::CData(data) => {
                let raw = data.into_inner();
                parser.text(&String::from_utf8_lossy(&raw), position)?;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    parser.finish(reader.buffer_position() as u64)
}

fn write_text_element<W: Write>(writer: &mut Writer<W>, tag: &str, text: &str) -> CodecResult<()> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn local_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Fio,
    Group,
}

impl Field {
    fn tag(self) -> &'static str {
        match self {
            Self::Fio => TAG_FIO,
            Self::Group => TAG_GROUP,
        }
    }
}

/// Position in the element tree. The subject context lives only inside
/// `InExam`/`InGrade`, so it cannot leak past `</exam>`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ParseState {
    Outside,
    InStudents,
    InStudent,
    InField(Field),
    InExamsBlock,
    InExam { subject: String, graded: bool },
    InGrade { subject: String },
    Done,
}

impl ParseState {
    fn describe(&self) -> &'static str {
        match self {
            Self::Outside => "document start",
            Self::InStudents => "<students>",
            Self::InStudent => "<student>",
            Self::InField(Field::Fio) => "<fio>",
            Self::InField(Field::Group) => "<group>",
            Self::InExamsBlock => "<exams>",
            Self::InExam { .. } => "<exam>",
            Self::InGrade { .. } => "<grade>",
            Self::Done => "document end",
        }
    }
}

#[derive(Debug, Default)]
struct StudentDraft {
    fio: String,
    group: String,
    exams: Exams,
}

#[derive(Debug)]
struct MarkupParser {
    state: ParseState,
    draft: StudentDraft,
    text: String,
    parsed: Vec<NewStudent>,
}

impl Default for MarkupParser {
    fn default() -> Self {
        Self {
            state: ParseState::Outside,
            draft: StudentDraft::default(),
            text: String::new(),
            parsed: Vec::new(),
        }
    }
}

impl MarkupParser {
    fn open(&mut self, element: &BytesStart<'_>, position: u64) -> CodecResult<()> {
        let name = local_name(element);
        let next = match (&self.state, name.as_str()) {
            (ParseState::Outside, TAG_STUDENTS) => ParseState::InStudents,
            (ParseState::InStudents, TAG_STUDENT) => {
                self.draft = StudentDraft::default();
                ParseState::InStudent
            }
            (ParseState::InStudent, TAG_FIO) => {
                self.text.clear();
                ParseState::InField(Field::Fio)
            }
            (ParseState::InStudent, TAG_GROUP) => {
                self.text.clear();
                ParseState::InField(Field::Group)
            }
            (ParseState::InStudent, TAG_EXAMS) => ParseState::InExamsBlock,
            (ParseState::InExamsBlock, TAG_EXAM) => ParseState::InExam {
                subject: subject_attribute(element, position)?,
                graded: false,
            },
            (ParseState::InExam { subject, graded: false }, TAG_GRADE) => {
                self.text.clear();
                ParseState::InGrade {
                    subject: subject.clone(),
                }
            }
            (state, _) => {
                return Err(malformed(
                    position,
                    format!("unexpected <{name}> inside {}", state.describe()),
                ));
            }
        };
        self.state = next;
        Ok(())
    }

    fn close(&mut self, name: &str, position: u64) -> CodecResult<()> {
        let state = std::mem::replace(&mut self.state, ParseState::Done);
        self.state = match (state, name) {
            (ParseState::InField(field), tag) if tag == field.tag() => {
                let value = self.text.trim().to_string();
                match field {
                    Field::Fio => self.draft.fio.push_str(&value),
                    Field::Group => self.draft.group.push_str(&value),
                }
                ParseState::InStudent
            }
            (ParseState::InGrade { subject }, TAG_GRADE) => {
                let raw = self.text.trim();
                let grade = raw.parse::<i64>().map_err(|_| {
                    malformed(position, format!("grade `{raw}` for `{subject}` is not an integer"))
                })?;
                self.draft.exams.insert(subject.clone(), grade);
                ParseState::InExam {
                    subject,
                    graded: true,
                }
            }
            (ParseState::InExam { subject, graded }, TAG_EXAM) => {
                if !graded {
                    return Err(malformed(
                        position,
                        format!("exam `{subject}` has no <grade>"),
                    ));
                }
                ParseState::InExamsBlock
            }
            (ParseState::InExamsBlock, TAG_EXAMS) => ParseState::InStudent,
            (ParseState::InStudent, TAG_STUDENT) => {
                let draft = std::mem::take(&mut self.draft);
                self.parsed.push(NewStudent {
                    fio: draft.fio,
                    group: draft.group,
                    exams: draft.exams,
                });
                ParseState::InStudents
            }
            (ParseState::InStudents, TAG_STUDENTS) => ParseState::Done,
            (state, _) => {
                return Err(malformed(
                    position,
                    format!("unexpected </{name}> inside {}", state.describe()),
                ));
            }
        };
        Ok(())
    }

    fn text(&mut self, content: &str, position: u64) -> CodecResult<()> {
        match self.state {
            ParseState::InField(_) | ParseState::InGrade { .. } => {
                self.text.push_str(content);
                Ok(())
            }
            _ if content.trim().is_empty() => Ok(()),
            ref state => Err(malformed(
                position,
                format!("unexpected text inside {}", state.describe()),
            )),
        }
    }

    fn finish(self, position: u64) -> CodecResult<Vec<NewStudent>> {
        if self.state != ParseState::Done {
            return Err(malformed(
                position,
                format!("document ended inside {}", self.state.describe()),
            ));
        }
        Ok(self.parsed)
    }
}

fn subject_attribute(element: &BytesStart<'_>, position: u64) -> CodecResult<String> {
    for attribute in element.attributes() {
        let attribute =
            attribute.map_err(|err| malformed(position, format!("invalid attribute: {err}")))?;
        if attribute.key.local_name().as_ref() == ATTR_SUBJECT.as_bytes() {
            return Ok(attribute.unescape_value()?.into_owned());
        }
    }
    Err(malformed(position, "exam is missing the `subject` attribute".to_string()))
}

fn malformed(position: u64, message: String) -> CodecError {
    CodecError::Malformed { position, message }
}

#[cfg(test)]
mod tests {
    use super::{parse_students, write_students};
    use crate::codec::CodecError;
    use crate::model::student::{NewStudent, Student};

    fn sample_student() -> Student {
        Student {
            id: 7,
            fio: "Anna & Maria Lee".to_string(),
            group: "654321".to_string(),
            exams: [("Math".to_string(), 8), ("Physics".to_string(), 6)]
                .into_iter()
                .collect(),
        }
    }

    fn render(students: &[Student]) -> String {
        let mut out = Vec::new();
        write_students(&mut out, students).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn writer_emits_declaration_and_nested_layout() {
        let xml = render(&[sample_student()]);
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains("<fio>Anna &amp; Maria Lee</fio>"));
        assert!(xml.contains(r#"<exam subject="Math">"#));
        assert!(xml.contains("<grade>8</grade>"));
        assert!(xml.contains("\n  <student>\n"));
    }

    #[test]
    fn parser_reads_what_writer_wrote() {
        let original = sample_student();
        let parsed = parse_students(render(&[original.clone()]).as_bytes()).unwrap();
        assert_eq!(parsed, vec![original.to_new_student()]);
    }

    #[test]
    fn parser_trims_field_text() {
        let xml = "<students><student><fio>  Ivan Petrov \n</fio><group> 123456 </group>\
                   <exams><exam subject=\"Math\"><grade> 9 </grade></exam></exams>\
                   </student></students>";
        let parsed = parse_students(xml.as_bytes()).unwrap();
        assert_eq!(
            parsed,
            vec![NewStudent::new("Ivan Petrov", "123456").with_exam("Math", 9)]
        );
    }

    #[test]
    fn empty_root_yields_no_students() {
        assert!(parse_students("<students/>".as_bytes()).unwrap().is_empty());
        assert!(parse_students("<students></students>".as_bytes())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn non_integer_grade_is_malformed() {
        let xml = "<students><student><fio>Ivan Petrov</fio><group>123456</group>\
                   <exams><exam subject=\"Math\"><grade>eight</grade></exam></exams>\
                   </student></students>";
        let err = parse_students(xml.as_bytes()).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { ref message, .. } if message.contains("eight")));
    }

    #[test]
    fn unexpected_nesting_is_malformed() {
        let xml = "<students><student><exams><fio>Ivan</fio></exams></student></students>";
        let err = parse_students(xml.as_bytes()).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { ref message, .. } if message.contains("<fio>")));
    }

    #[test]
    fn exam_without_subject_is_malformed() {
        let xml = "<students><student><exams><exam><grade>5</grade></exam></exams></student></students>";
        let err = parse_students(xml.as_bytes()).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
    }

    #[test]
    fn text_between_exams_is_not_attributed_to_a_subject() {
        let xml = "<students><student><exams><exam subject=\"Math\"><grade>5</grade></exam>\
                   stray</exams></student></students>";
        let err = parse_students(xml.as_bytes()).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { ref message, .. } if message.contains("<exams>")));
    }

    #[test]
    fn truncated_document_is_rejected() {
        let xml = "<students><student><fio>Ivan Petrov</fio>";
        assert!(parse_students(xml.as_bytes()).is_err());
    }
}
