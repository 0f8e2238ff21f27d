use std::borrow::Cow;
use std::cell::Ref;

use crate::error::{Result, StoreError};

use super::file::{SharedShellFile, StructureInfo};
use super::tse::{Kind, Tse};

/// Reader for TSE words that have not been loaded into memory.
///
/// Implemented by the caller's file layer.
pub trait TseSource {
    /// Fills `out` with the words starting at `byte_offset`.
    ///
    /// # Errors
    ///
    /// Implementations report read failures, usually as `StoreError::Source`.
    fn read_words(&mut self, byte_offset: u64, out: &mut [u16]) -> Result<()>;
}

/// Where a shell's TSE words live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TseStorage {
    /// `offsets` has one entry per row plus a terminator, counted in TSEs.
    InMemory { words: Vec<u16>, offsets: Vec<usize> },
    /// `offsets` are byte offsets into the source, with a terminator.
    OnDisk { offsets: Vec<u64> },
}

/// One structure's TSEs, laid out slice by slice and row by row.
#[derive(Debug, Clone)]
pub struct ShellData {
    file: SharedShellFile,
    shell_number: usize,
    rows: usize,
    slices: usize,
    storage: TseStorage,
}

/// The TSEs of one row, borrowed from memory or read from a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TseRow<'a> {
    kind: Kind,
    words: Cow<'a, [u16]>,
}

impl TseRow<'_> {
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len() / self.kind.words()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Returns the `i`-th TSE of the row.
    #[must_use]
    pub fn get(&self, i: usize) -> Tse {
        let n = self.kind.words();
        Tse::from_words(self.kind, &self.words[i * n..])
    }

    pub fn iter(&self) -> impl Iterator<Item = Tse> + '_ {
        self.words
            .chunks_exact(self.kind.words())
            .map(move |w| Tse::from_words(self.kind, w))
    }

    #[must_use]
    pub fn words(&self) -> &[u16] {
        &self.words
    }
}

/// Validates the layout and that the header describes structure `shell_number`.
fn check_header(file: &SharedShellFile, shell_number: usize) -> Result<Kind> {
    let f = file.borrow();
    f.validate()?;
    if shell_number >= f.structures.len() {
        return Err(StoreError::EntityNotFound(format!("structure {shell_number}")).into());
    }
    Ok(f.kind())
}

fn check_offsets<T: Copy + PartialOrd>(offsets: &[T], rows: usize, slices: usize) -> Result<()> {
    if offsets.len() != rows * slices + 1 {
        return Err(StoreError::InvalidLayout(format!(
            "{} offsets for {rows} rows and {slices} slices",
            offsets.len()
        ))
        .into());
    }
    if offsets.windows(2).any(|w| w[1] < w[0]) {
        return Err(StoreError::InvalidLayout("offsets decrease".into()).into());
    }
    Ok(())
}

impl ShellData {
    /// Creates in-memory shell data for structure `shell_number` of `file`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidLayout` if the offset table does not match
    /// `rows * slices` or the word count, or if the header fails validation.
    pub fn in_memory(
        file: SharedShellFile,
        shell_number: usize,
        rows: usize,
        slices: usize,
        words: Vec<u16>,
        offsets: Vec<usize>,
    ) -> Result<Self> {
        let kind = check_header(&file, shell_number)?;
        check_offsets(&offsets, rows, slices)?;
        let total = offsets.last().copied().unwrap_or(0);
        if total * kind.words() != words.len() {
            return Err(StoreError::InvalidLayout(format!(
                "{} words for {total} TSEs",
                words.len()
            ))
            .into());
        }
        Ok(Self {
            file,
            shell_number,
            rows,
            slices,
            storage: TseStorage::InMemory { words, offsets },
        })
    }

    /// Creates shell data whose rows are read on demand through a [`TseSource`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidLayout` if the byte offset table has the wrong length.
    pub fn on_disk(
        file: SharedShellFile,
        shell_number: usize,
        rows: usize,
        slices: usize,
        offsets: Vec<u64>,
    ) -> Result<Self> {
        check_header(&file, shell_number)?;
        check_offsets(&offsets, rows, slices)?;
        Ok(Self {
            file,
            shell_number,
            rows,
            slices,
            storage: TseStorage::OnDisk { offsets },
        })
    }

    #[must_use]
    pub fn file(&self) -> &SharedShellFile {
        &self.file
    }

    #[must_use]
    pub fn shell_number(&self) -> usize {
        self.shell_number
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn slices(&self) -> usize {
        self.slices
    }

    #[must_use]
    pub fn storage(&self) -> &TseStorage {
        &self.storage
    }

    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        matches!(self.storage, TseStorage::InMemory { .. })
    }

    /// TSE layout, decided by the header.
    #[must_use]
    pub fn classify(&self) -> Kind {
        self.file.borrow().kind()
    }

    /// This structure's header entry.
    ///
    /// # Panics
    ///
    /// Panics if the header is mutably borrowed elsewhere.
    #[must_use]
    pub fn structure(&self) -> Ref<'_, StructureInfo> {
        let n = self.shell_number;
        Ref::map(self.file.borrow(), |f| &f.structures[n])
    }

    /// Total number of TSEs.
    #[must_use]
    pub fn tse_count(&self) -> usize {
        match &self.storage {
            TseStorage::InMemory { offsets, .. } => offsets.last().copied().unwrap_or(0),
            TseStorage::OnDisk { .. } => self.structure().tse_count,
        }
    }

    fn row_index(&self, slice: usize, row: usize) -> Result<usize> {
        if slice >= self.slices || row >= self.rows {
            return Err(StoreError::RowOutOfRange { slice, row }.into());
        }
        Ok(slice * self.rows + row)
    }

    /// Borrows the TSEs of an in-memory row.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotInMemory` for on-disk data and
    /// `StoreError::RowOutOfRange` for a row outside the shell.
    pub fn row(&self, slice: usize, row: usize) -> Result<TseRow<'_>> {
        let i = self.row_index(slice, row)?;
        match &self.storage {
            TseStorage::InMemory { words, offsets } => {
                let kind = self.classify();
                let n = kind.words();
                Ok(TseRow {
                    kind,
                    words: Cow::Borrowed(&words[offsets[i] * n..offsets[i + 1] * n]),
                })
            }
            TseStorage::OnDisk { .. } => Err(StoreError::NotInMemory.into()),
        }
    }

    /// Returns the TSEs of a row from either storage.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::RowOutOfRange` for a row outside the shell and
    /// any error reported by `source`.
    pub fn materialize_row(
        &self,
        slice: usize,
        row: usize,
        source: &mut dyn TseSource,
    ) -> Result<TseRow<'_>> {
        let i = self.row_index(slice, row)?;
        match &self.storage {
            TseStorage::InMemory { .. } => self.row(slice, row),
            TseStorage::OnDisk { offsets } => {
                let kind = self.classify();
                let bytes = offsets[i + 1] - offsets[i];
                let len = usize::try_from(bytes / 2)
                    .map_err(|_| StoreError::InvalidLayout("row too long".into()))?;
                let mut words = vec![0u16; len];
                source.read_words(offsets[i], &mut words)?;
                Ok(TseRow {
                    kind,
                    words: Cow::Owned(words),
                })
            }
        }
    }

    /// Reads on-disk rows into memory. In-memory data are left as they are.
    ///
    /// # Errors
    ///
    /// Returns any error reported by `source` or allocation failure; the data
    /// stay on disk in that case.
    pub fn load(&mut self, source: &mut dyn TseSource) -> Result<()> {
        let TseStorage::OnDisk { offsets } = &self.storage else {
            return Ok(());
        };
        let total_bytes = offsets.last().copied().unwrap_or(0) - offsets.first().copied().unwrap_or(0);
        let total_words = usize::try_from(total_bytes / 2)
            .map_err(|_| StoreError::InvalidLayout("shell too large".into()))?;
        let kind = self.classify();
        let mut words = Vec::new();
        crate::error::try_grow("TSE words", &mut words, total_words)?;
        let mut new_offsets = Vec::with_capacity(offsets.len());
        new_offsets.push(0);
        for i in 0..self.rows * self.slices {
            let row = self.materialize_row(i / self.rows.max(1), i % self.rows.max(1), source)?;
            words.extend_from_slice(row.words());
            new_offsets.push(words.len() / kind.words());
        }
        tracing::debug!(shell = self.shell_number, tses = words.len() / kind.words(), "loaded shell");
        self.storage = TseStorage::InMemory {
            words,
            offsets: new_offsets,
        };
        Ok(())
    }

    /// Installs freshly built TSE words, replacing the current storage.
    ///
    /// Updates the TSE counts in the header and clears the volume and surface area.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidLayout` if the tables disagree with `rows` and `slices`.
    pub fn put_new_data(
        &mut self,
        rows: usize,
        slices: usize,
        words: Vec<u16>,
        offsets: Vec<usize>,
    ) -> Result<()> {
        check_offsets(&offsets, rows, slices)?;
        let total = offsets.last().copied().unwrap_or(0);
        if total * self.classify().words() != words.len() {
            return Err(StoreError::InvalidLayout("word count does not match offsets".into()).into());
        }
        self.rows = rows;
        self.slices = slices;
        self.storage = TseStorage::InMemory { words, offsets };
        self.record_counts(total);
        Ok(())
    }

    pub(crate) fn record_counts(&mut self, total: usize) {
        let ntse = 1 + self.slices * (1 + self.rows);
        let mut f = self.file.borrow_mut();
        let info = &mut f.structures[self.shell_number];
        info.tse_count = total;
        info.ntse = ntse;
        info.volume = None;
        info.surface_area = None;
    }

    pub(crate) fn set_box(&mut self, rows: usize, slices: usize, offsets: Vec<usize>) {
        self.rows = rows;
        self.slices = slices;
        if let TseStorage::InMemory { offsets: o, .. } = &mut self.storage {
            *o = offsets;
        }
    }

    pub(crate) fn in_memory_offsets(&self) -> Result<&[usize]> {
        match &self.storage {
            TseStorage::InMemory { offsets, .. } => Ok(offsets),
            TseStorage::OnDisk { .. } => Err(StoreError::NotInMemory.into()),
        }
    }
}
