use super::{Columns, Error, Record, get_file};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::{fs::File, io::Read, marker::PhantomData};
use zip::{ZipArchive, read::ZipFile};

/// Forward-only, single-pass reader over one feed file.
///
/// Yields `Some(Ok(record))` per data row and `None` once the file is
/// exhausted. A read or decode failure is yielded once as `Some(Err(_))`
/// and ends the stream.
pub struct RecordStream<'a, T> {
    file: String,
    reader: csv::Reader<ZipFile<'a, File>>,
    columns: Columns,
    record: StringRecord,
    row: usize,
    done: bool,
    _record: PhantomData<T>,
}

impl<'a, T: Record> RecordStream<'a, T> {
    pub(crate) fn open(archive: &'a mut ZipArchive<File>, name: &str) -> Result<Self, Error> {
        let file = get_file(archive, name)?;
        let mut reader = csv_reader(file);
        let columns = Columns::from_header(reader.headers()?);
        if columns.is_empty() {
            return Err(Error::MissingHeader(name.to_string()));
        }
        Ok(Self {
            file: name.to_string(),
            reader,
            columns,
            record: StringRecord::new(),
            row: 0,
            done: false,
            _record: PhantomData,
        })
    }

    /// Data rows read so far, header excluded.
    pub fn rows_read(&self) -> usize {
        self.row
    }
}

impl<T: Record> Iterator for RecordStream<'_, T> {
    type Item = Result<T, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.read_record(&mut self.record) {
            Ok(false) => {
                self.done = true;
                None
            }
            Ok(true) => {
                self.row += 1;
                let row = self.columns.row(&self.record);
                let result = T::decode(&row).map_err(|source| Error::Record {
                    file: self.file.clone(),
                    row: self.row,
                    source,
                });
                self.done = result.is_err();
                Some(result)
            }
            Err(source) => {
                self.done = true;
                Some(Err(Error::Read {
                    file: self.file.clone(),
                    row: self.row + 1,
                    source,
                }))
            }
        }
    }
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader)
}
