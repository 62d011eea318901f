// SPDX-FileCopyrightText: 2025 - 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! Paged, zero-filled memory for a [Machine](crate::Machine)
//!
//! Memory is conceptually an infinite tape of `i64`s. It's stored as a map of fixed-size pages, so
//! that a program writing to address `1_000_000` doesn't allocate a million cells to get there.
//! Pages that were never written read as zeroes.

use itertools::Itertools;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::ops::{Index, IndexMut};

const PAGE_SIZE: usize = 512;
const PAGE_MASK: u64 = PAGE_SIZE as u64 - 1;

macro_rules! page_index {
    ($addr: expr) => {{
        #[allow(clippy::cast_possible_truncation, reason = "masked down anyway")]
        {
            ($addr & PAGE_MASK) as usize
        }
    }};
}

macro_rules! page_base {
    ($addr: expr) => {{ $addr & !PAGE_MASK }};
}

static EMPTY: [i64; PAGE_SIZE] = [0; PAGE_SIZE];

/// Auto-extending memory tape
///
/// Reading an address that was never written yields `0`. Writing to an address past the end of
/// the tape extends it, so [`len`](Memory::len) is always one past the highest address that was
/// loaded or written.
#[derive(Default)]
pub struct Memory {
    pages: HashMap<u64, Box<[i64; PAGE_SIZE]>>,
    len: u64,
}

impl Memory {
    fn page(&self, base: u64) -> &[i64; PAGE_SIZE] {
        self.pages.get(&base).map_or(&EMPTY, |p| p.as_ref())
    }

    /// Return the value stored at `address`, or `0` if nothing was ever stored there
    #[doc(alias = "peek")]
    pub fn read(&self, address: u64) -> i64 {
        self[address]
    }

    /// Store `value` at `address`
    #[doc(alias = "poke")]
    pub fn write(&mut self, address: u64, value: i64) {
        self[address] = value;
    }

    /// Read `len` consecutive cells starting at `start`.
    ///
    /// Borrows directly from the backing page when the whole range lies within one page.
    pub fn read_range(&self, start: u64, len: u64) -> Cow<'_, [i64]> {
        if len == 0 {
            return Cow::Borrowed(&[]);
        }
        let last = start + len - 1;
        let first_page = page_base!(start);
        let last_page = page_base!(last);
        if first_page == last_page {
            Cow::Borrowed(&self.page(first_page)[page_index!(start)..=page_index!(last)])
        } else {
            #[allow(clippy::cast_possible_truncation, reason = "caller asked for this much")]
            let mut v = Vec::with_capacity(len as usize);
            v.extend_from_slice(&self.page(first_page)[page_index!(start)..]);
            for base in ((first_page + PAGE_SIZE as u64)..last_page).step_by(PAGE_SIZE) {
                v.extend_from_slice(self.page(base));
            }
            v.extend_from_slice(&self.page(last_page)[..=page_index!(last)]);
            Cow::Owned(v)
        }
    }

    /// One past the highest address that was loaded or written
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether nothing was ever loaded into or written to memory
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy out the whole tape, from address `0` up to [`len`](Memory::len)
    pub fn to_vec(&self) -> Vec<i64> {
        self.read_range(0, self.len).into_owned()
    }

    /// Drop pages that only contain zeroes
    pub fn prune(&mut self) {
        self.pages.retain(|_, p| p[..] != EMPTY);
        self.pages.shrink_to_fit();
    }

    fn live_pages(&self) -> impl Iterator<Item = (&u64, &[i64; PAGE_SIZE])> {
        self.pages
            .iter()
            .map(|(base, p)| (base, p.as_ref()))
            .filter(|(_, p)| *p != &EMPTY)
    }
}

impl Index<u64> for Memory {
    type Output = i64;
    fn index(&self, address: u64) -> &i64 {
        self.pages
            .get(&page_base!(address))
            .map_or(&0, |p| p.index(page_index!(address)))
    }
}

impl IndexMut<u64> for Memory {
    fn index_mut(&mut self, address: u64) -> &mut i64 {
        self.len = self.len.max(address + 1);
        self.pages
            .entry(page_base!(address))
            .or_insert_with(|| Box::new([0; PAGE_SIZE]))
            .index_mut(page_index!(address))
    }
}

impl FromIterator<i64> for Memory {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut pages = HashMap::with_capacity(iter.size_hint().0.div_ceil(PAGE_SIZE));
        let mut len = 0;

        for (n, chunk) in (&iter.chunks(PAGE_SIZE)).into_iter().enumerate() {
            let mut page = Box::new([0; PAGE_SIZE]);
            for (cell, val) in page.iter_mut().zip(chunk) {
                *cell = val;
                len += 1;
            }
            pages.insert((n * PAGE_SIZE) as u64, page);
        }

        Self { pages, len }
    }
}

// trailing zeroes don't count, so a program compares equal to itself after reading past its end
impl PartialEq for Memory {
    fn eq(&self, other: &Self) -> bool {
        let count = self.live_pages().count();
        count == other.live_pages().count()
            && self
                .live_pages()
                .all(|(base, page)| other.page(*base) == page)
    }
}

impl Clone for Memory {
    fn clone(&self) -> Self {
        // don't copy blank pages
        let pages = self
            .live_pages()
            .map(|(&base, page)| (base, Box::new(*page)))
            .collect();
        Self {
            pages,
            len: self.len,
        }
    }
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (base, page) in self.live_pages().sorted_unstable_by_key(|(base, _)| **base) {
            map.entry(&format_args!("page 0x{base:04x}"), &format_args!("{page:?}"));
        }
        map.finish()
    }
}
