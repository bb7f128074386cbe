//! Binary model persistence for all engine variants.
//!
//! All layouts share a little-endian, padding-free header:
//!
//! ```text
//! u32 threshold | u32 num_literals | u32 num_clauses | u32 num_classes
//! i8 max_state | i8 min_state | u8 boost | f64 s
//! i16 weights[num_clauses * num_classes]
//! ```
//!
//! The dense layout follows with the flat `i8` counter array. The sparse
//! layout instead stores per-clause `(u32 ta_id, i8 state)` records in
//! strictly increasing `ta_id`, each clause terminated by a `0xFFFF_FFFF`
//! sentinel; the stateless layout is the same with bare `u32 ta_id`
//! records. Sparse and stateless engines can also cross-load a dense file,
//! keeping exactly the automata at or above the mid state.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path
};

use log::debug;

use crate::{
    automaton::action,
    config::Config,
    dense::DenseTsetlinMachine,
    error::{Error, Result},
    prng::Xorshift32,
    sparse::{NodeList, SparseTsetlinMachine, TaRecord},
    stateless::{LiteralList, StatelessTsetlinMachine}
};

/// Terminates each clause's record list.
const CLAUSE_SENTINEL: u32 = u32::MAX;

/// Seed handed to engines reconstructed from a file.
const LOADED_MODEL_SEED: u32 = 42;

fn read_u8<R: Read>(r: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_i8<R: Read>(r: &mut R) -> Result<i8> {
    Ok(read_u8(r)? as i8)
}

fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_i16<R: Read>(r: &mut R) -> Result<i16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(i16::from_le_bytes(buf))
}

fn read_f64<R: Read>(r: &mut R) -> Result<f64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

fn write_u32<W: Write>(w: &mut W, v: u32) -> Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Shared header of every model layout.
struct Header {
    threshold:    u32,
    num_literals: u32,
    num_clauses:  u32,
    num_classes:  u32,
    max_state:    i8,
    min_state:    i8,
    boost:        u8,
    s:            f64
}

impl Header {
    fn from_config(config: &Config) -> Self {
        Self {
            threshold:    config.threshold,
            num_literals: config.num_literals as u32,
            num_clauses:  config.num_clauses as u32,
            num_classes:  config.num_classes as u32,
            max_state:    config.max_state,
            min_state:    config.min_state,
            boost:        u8::from(config.boost_true_positive_feedback),
            s:            f64::from(config.s)
        }
    }

    /// The label layout is not stored in the file; the caller supplies it,
    /// exactly as at construction time.
    fn into_config(self, y_size: usize, y_element_size: usize) -> Result<Config> {
        let config = Config {
            num_classes: self.num_classes as usize,
            threshold: self.threshold,
            num_literals: self.num_literals as usize,
            num_clauses: self.num_clauses as usize,
            max_state: self.max_state,
            min_state: self.min_state,
            boost_true_positive_feedback: self.boost != 0,
            s: self.s as f32,
            y_size,
            y_element_size
        };
        config.validate()?;
        Ok(config)
    }

    fn read<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            threshold:    read_u32(r)?,
            num_literals: read_u32(r)?,
            num_clauses:  read_u32(r)?,
            num_classes:  read_u32(r)?,
            max_state:    read_i8(r)?,
            min_state:    read_i8(r)?,
            boost:        read_u8(r)?,
            s:            read_f64(r)?
        })
    }

    fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        write_u32(w, self.threshold)?;
        write_u32(w, self.num_literals)?;
        write_u32(w, self.num_clauses)?;
        write_u32(w, self.num_classes)?;
        w.write_all(&[self.max_state as u8, self.min_state as u8, self.boost])?;
        w.write_all(&self.s.to_le_bytes())?;
        Ok(())
    }
}

fn read_weights<R: Read>(r: &mut R, config: &Config) -> Result<Vec<i16>> {
    let mut weights = vec![0i16; config.num_clauses * config.num_classes];
    for w in weights.iter_mut() {
        *w = read_i16(r)?;
    }
    Ok(weights)
}

fn write_weights<W: Write>(w: &mut W, weights: &[i16]) -> Result<()> {
    for &weight in weights {
        w.write_all(&weight.to_le_bytes())?;
    }
    Ok(())
}

fn read_dense_states<R: Read>(r: &mut R, config: &Config) -> Result<Vec<i8>> {
    let mut bytes = vec![0u8; config.num_clauses * config.num_literals * 2];
    r.read_exact(&mut bytes)?;
    Ok(bytes.into_iter().map(|b| b as i8).collect())
}

/// Validates a record id against the clause built so far.
fn check_record(list_last: Option<u32>, ta_id: u32, config: &Config) -> Result<()> {
    if ta_id as usize >= config.num_literals * 2 {
        return Err(Error::Malformed("ta_id out of range"));
    }
    if let Some(last) = list_last {
        if last >= ta_id {
            return Err(Error::Malformed("ta_id not strictly increasing"));
        }
    }
    Ok(())
}

impl DenseTsetlinMachine {
    /// # Overview
    ///
    /// Writes the dense layout to a writer.
    pub fn save_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        Header::from_config(&self.config).write(writer)?;
        write_weights(writer, &self.weights)?;

        let bytes: Vec<u8> = self.ta_state.iter().map(|&s| s as u8).collect();
        writer.write_all(&bytes)?;
        Ok(())
    }

    /// # Overview
    ///
    /// Saves the dense layout to a file. A failed write reports the error
    /// and may leave a partial file; in-memory state is untouched.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        self.save_to(&mut writer)?;
        writer.flush()?;
        debug!("saved dense model to {}", path.as_ref().display());
        Ok(())
    }

    /// # Overview
    ///
    /// Reads the dense layout from a reader. The label layout is supplied
    /// by the caller, as at construction time.
    pub fn load_from<R: Read>(
        reader: &mut R,
        y_size: usize,
        y_element_size: usize
    ) -> Result<Self> {
        let config = Header::read(reader)?.into_config(y_size, y_element_size)?;
        let weights = read_weights(reader, &config)?;
        let ta_state = read_dense_states(reader, &config)?;
        Ok(Self::from_parts(
            config,
            ta_state,
            weights,
            Xorshift32::new(LOADED_MODEL_SEED)
        ))
    }

    /// # Overview
    ///
    /// Loads a dense model file.
    pub fn load<P: AsRef<Path>>(
        path: P,
        y_size: usize,
        y_element_size: usize
    ) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path.as_ref())?);
        let tm = Self::load_from(&mut reader, y_size, y_element_size)?;
        debug!(
            "loaded dense model from {}: {} clauses over {} literals",
            path.as_ref().display(),
            tm.config.num_clauses,
            tm.config.num_literals
        );
        Ok(tm)
    }
}

impl SparseTsetlinMachine {
    /// # Overview
    ///
    /// Writes the sparse layout to a writer.
    pub fn save_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        Header::from_config(&self.config).write(writer)?;
        write_weights(writer, &self.weights)?;

        for clause in 0..self.config.num_clauses {
            for node in self.clause_nodes(clause) {
                write_u32(writer, node.ta_id)?;
                writer.write_all(&[node.state as u8])?;
            }
            write_u32(writer, CLAUSE_SENTINEL)?;
        }
        Ok(())
    }

    /// # Overview
    ///
    /// Saves the sparse layout to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        self.save_to(&mut writer)?;
        writer.flush()?;
        debug!("saved sparse model to {}", path.as_ref().display());
        Ok(())
    }

    /// # Overview
    ///
    /// Reads the sparse layout from a reader.
    pub fn load_from<R: Read>(
        reader: &mut R,
        y_size: usize,
        y_element_size: usize
    ) -> Result<Self> {
        let config = Header::read(reader)?.into_config(y_size, y_element_size)?;
        let weights = read_weights(reader, &config)?;

        let mut clauses = Vec::with_capacity(config.num_clauses);
        for _ in 0..config.num_clauses {
            let mut list = NodeList::new();
            loop {
                let ta_id = read_u32(reader)?;
                if ta_id == CLAUSE_SENTINEL {
                    break;
                }
                check_record(list.last().map(|n: &TaRecord| n.ta_id), ta_id, &config)?;
                let state = read_i8(reader)?;
                list.push(TaRecord {
                    ta_id,
                    state
                });
            }
            clauses.push(list);
        }

        Ok(Self::from_parts(
            config,
            clauses,
            weights,
            Xorshift32::new(LOADED_MODEL_SEED)
        ))
    }

    /// # Overview
    ///
    /// Loads a sparse model file.
    pub fn load<P: AsRef<Path>>(
        path: P,
        y_size: usize,
        y_element_size: usize
    ) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path.as_ref())?);
        let stm = Self::load_from(&mut reader, y_size, y_element_size)?;
        debug!(
            "loaded sparse model from {}: {} stored automata",
            path.as_ref().display(),
            stm.total_nodes()
        );
        Ok(stm)
    }

    /// # Overview
    ///
    /// Reads a *dense* model from a reader and converts it, keeping every
    /// included automaton together with its counter.
    pub fn load_dense_from<R: Read>(
        reader: &mut R,
        y_size: usize,
        y_element_size: usize
    ) -> Result<Self> {
        let config = Header::read(reader)?.into_config(y_size, y_element_size)?;
        let weights = read_weights(reader, &config)?;
        let states = read_dense_states(reader, &config)?;

        let mid = config.mid_state();
        let span = config.num_literals * 2;
        let clauses = states
            .chunks_exact(span)
            .map(|ta_row| {
                ta_row
                    .iter()
                    .enumerate()
                    .filter(|&(_, &state)| action(state, mid))
                    .map(|(i, &state)| TaRecord {
                        ta_id: i as u32,
                        state
                    })
                    .collect()
            })
            .collect();

        Ok(Self::from_parts(
            config,
            clauses,
            weights,
            Xorshift32::new(LOADED_MODEL_SEED)
        ))
    }

    /// # Overview
    ///
    /// Loads a dense model file into sparse form.
    pub fn load_dense<P: AsRef<Path>>(
        path: P,
        y_size: usize,
        y_element_size: usize
    ) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path.as_ref())?);
        let stm = Self::load_dense_from(&mut reader, y_size, y_element_size)?;
        debug!(
            "cross-loaded dense model from {} into sparse form: {} stored automata",
            path.as_ref().display(),
            stm.total_nodes()
        );
        Ok(stm)
    }
}

impl StatelessTsetlinMachine {
    /// # Overview
    ///
    /// Writes the stateless layout to a writer.
    pub fn save_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        Header::from_config(&self.config).write(writer)?;
        write_weights(writer, &self.weights)?;

        for clause in 0..self.config.num_clauses {
            for &ta_id in self.clause_literals(clause) {
                write_u32(writer, ta_id)?;
            }
            write_u32(writer, CLAUSE_SENTINEL)?;
        }
        Ok(())
    }

    /// # Overview
    ///
    /// Saves the stateless layout to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        self.save_to(&mut writer)?;
        writer.flush()?;
        debug!("saved stateless model to {}", path.as_ref().display());
        Ok(())
    }

    /// # Overview
    ///
    /// Reads the stateless layout from a reader.
    pub fn load_from<R: Read>(
        reader: &mut R,
        y_size: usize,
        y_element_size: usize
    ) -> Result<Self> {
        let config = Header::read(reader)?.into_config(y_size, y_element_size)?;
        let weights = read_weights(reader, &config)?;

        let mut clauses = Vec::with_capacity(config.num_clauses);
        for _ in 0..config.num_clauses {
            let mut list = LiteralList::new();
            loop {
                let ta_id = read_u32(reader)?;
                if ta_id == CLAUSE_SENTINEL {
                    break;
                }
                check_record(list.last().copied(), ta_id, &config)?;
                list.push(ta_id);
            }
            clauses.push(list);
        }

        Ok(Self::from_parts(config, clauses, weights))
    }

    /// # Overview
    ///
    /// Loads a stateless model file.
    pub fn load<P: AsRef<Path>>(
        path: P,
        y_size: usize,
        y_element_size: usize
    ) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path.as_ref())?);
        let sltm = Self::load_from(&mut reader, y_size, y_element_size)?;
        debug!(
            "loaded stateless model from {}: {} stored literals",
            path.as_ref().display(),
            sltm.total_literals()
        );
        Ok(sltm)
    }

    /// # Overview
    ///
    /// Reads a *dense* model from a reader and converts it, keeping only
    /// the indices of included automata.
    pub fn load_dense_from<R: Read>(
        reader: &mut R,
        y_size: usize,
        y_element_size: usize
    ) -> Result<Self> {
        let config = Header::read(reader)?.into_config(y_size, y_element_size)?;
        let weights = read_weights(reader, &config)?;
        let states = read_dense_states(reader, &config)?;

        let mid = config.mid_state();
        let span = config.num_literals * 2;
        let clauses = states
            .chunks_exact(span)
            .map(|ta_row| {
                ta_row
                    .iter()
                    .enumerate()
                    .filter(|&(_, &state)| action(state, mid))
                    .map(|(i, _)| i as u32)
                    .collect()
            })
            .collect();

        Ok(Self::from_parts(config, clauses, weights))
    }

    /// # Overview
    ///
    /// Loads a dense model file into stateless form.
    pub fn load_dense<P: AsRef<Path>>(
        path: P,
        y_size: usize,
        y_element_size: usize
    ) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path.as_ref())?);
        let sltm = Self::load_dense_from(&mut reader, y_size, y_element_size)?;
        debug!(
            "cross-loaded dense model from {} into stateless form: {} stored literals",
            path.as_ref().display(),
            sltm.total_literals()
        );
        Ok(sltm)
    }
}
