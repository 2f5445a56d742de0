//! Loading documents from files and saving them back.

use std::fs::File;
use std::io::{self, BufWriter, Read};
use std::path::Path;

use super::dom::Document;
use super::error::{Error, ErrorKind};

fn open_error(e: &io::Error) -> ErrorKind {
    match e.kind() {
        io::ErrorKind::NotFound => ErrorKind::FileNotFound,
        _ => ErrorKind::FileCouldNotBeOpened,
    }
}

impl Document {
    /// Reads the whole file and parses it, replacing the contents of
    /// the document.
    pub fn load_file<P>(&mut self, path: P) -> Result<(), Error>
        where P: AsRef<Path>
    {
        let path = path.as_ref();
        self.clear();

        let fail = |kind| Error::new(kind).with_context(path.display().to_string());

        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) => return Err(self.fail(fail(open_error(&e)).with_detail(e.to_string()))),
        };

        let mut bytes = Vec::new();
        if let Err(e) = file.read_to_end(&mut bytes) {
            return Err(self.fail(fail(ErrorKind::FileReadError).with_detail(e.to_string())));
        }

        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => return Err(self.fail(fail(ErrorKind::FileReadError).with_detail(e.to_string()))),
        };

        self.parse(&text)
    }

    /// Prints the document into the file, creating or truncating it.
    pub fn save_file<P>(&mut self, path: P, compact: bool) -> Result<(), Error>
        where P: AsRef<Path>
    {
        let path = path.as_ref();
        self.clear_error();

        let fail = |kind| Error::new(kind).with_context(path.display().to_string());

        let file = match File::create(path) {
            Ok(file) => file,
            Err(e) => return Err(self.fail(fail(ErrorKind::FileCouldNotBeOpened).with_detail(e.to_string()))),
        };

        match self.write_to(BufWriter::new(file), compact) {
            Ok(_) => Ok(()),
            Err(e) => Err(self.fail(fail(ErrorKind::FileWriteError).with_detail(e.to_string()))),
        }
    }
}

#[cfg(test)]
mod test {
    use std::env;
    use std::fs;
    use std::path::PathBuf;

    use super::super::{Document, ErrorKind};

    fn scratch(name: &str) -> PathBuf {
        env::temp_dir().join(format!("tinydom-{}-{}", std::process::id(), name))
    }

    #[test]
    fn save_then_load() {
        let path = scratch("save_then_load.xml");

        let mut doc = Document::new();
        doc.parse("\u{FEFF}<a x=\"1\"><b>text</b></a>").unwrap();
        doc.save_file(&path, false).unwrap();

        let mut loaded = Document::new();
        loaded.load_file(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert!(loaded.has_bom());
        let a = loaded.root_element().unwrap();
        assert_eq!(Some("1"), loaded.attribute(a, "x"));
        let b = loaded.first_child_element(a, Some("b")).unwrap();
        assert_eq!(Some("text"), loaded.text(b));
    }

    #[test]
    fn a_missing_file() {
        let path = scratch("does-not-exist.xml");
        let mut doc = Document::new();

        let e = doc.load_file(&path).unwrap_err();

        assert_eq!(ErrorKind::FileNotFound, e.kind());
        assert_eq!(Some(ErrorKind::FileNotFound), doc.error().map(|e| e.kind()));
    }

    #[test]
    fn a_file_that_is_not_utf8() {
        let path = scratch("latin1.xml");
        fs::write(&path, b"<a>\xE9</a>").unwrap();

        let mut doc = Document::new();
        let e = doc.load_file(&path).unwrap_err();
        fs::remove_file(&path).unwrap();

        assert_eq!(ErrorKind::FileReadError, e.kind());
    }

    #[test]
    fn parse_errors_come_through_load() {
        let path = scratch("broken.xml");
        fs::write(&path, "<a>x</b>").unwrap();

        let mut doc = Document::new();
        let e = doc.load_file(&path).unwrap_err();
        fs::remove_file(&path).unwrap();

        assert_eq!(ErrorKind::MismatchedElement, e.kind());
    }

    #[test]
    fn saving_into_a_missing_directory() {
        let path = scratch("no-such-dir").join("out.xml");
        let mut doc = Document::new();

        let e = doc.save_file(&path, true).unwrap_err();

        assert_eq!(ErrorKind::FileCouldNotBeOpened, e.kind());
    }
}
