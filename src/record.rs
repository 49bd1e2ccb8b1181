// 🧾 Records - Component observations and master registry candidates
//
// A ComponentRecord is one person seen in the census being identified.
// A MasterCandidate is one case row of an identity already in the registry.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// FIELD (raw value + standardized value)
// ============================================================================

/// A single observed attribute.
///
/// `standardized` is only ever set by the standardizer, and stays `None`
/// whenever `raw` is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field<T> {
    pub raw: Option<T>,
    pub standardized: Option<T>,
}

impl<T> Field<T> {
    pub fn new(raw: Option<T>) -> Self {
        Field {
            raw,
            standardized: None,
        }
    }

    pub fn is_present(&self) -> bool {
        self.raw.is_some()
    }
}

impl Field<String> {
    /// Build a text field, treating blank strings as absent
    pub fn text(raw: Option<String>) -> Self {
        Field::new(raw.filter(|s| !s.trim().is_empty()))
    }

    pub fn standardized_str(&self) -> Option<&str> {
        self.standardized.as_deref()
    }
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::new(None)
    }
}

// ============================================================================
// COMPONENT RECORD
// ============================================================================

/// One person-observation to be identified against the master registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentRecord {
    /// Line / sequence number in the component source
    pub line_num: i64,

    pub last_name: Field<String>,
    pub first_name: Field<String>,
    pub middle_name: Field<String>,
    pub second_middle_name: Field<String>,

    /// Neighborhood (gonfalone) code of residence
    pub neighborhood: Field<i32>,

    /// Identity assigned by the manual identification.
    /// Only used to measure accuracy, never for matching.
    pub ground_truth: Option<i64>,

    /// Observation year of the whole source table
    pub year: i32,
}

impl ComponentRecord {
    pub fn new(line_num: i64, year: i32) -> Self {
        ComponentRecord {
            line_num,
            last_name: Field::default(),
            first_name: Field::default(),
            middle_name: Field::default(),
            second_middle_name: Field::default(),
            neighborhood: Field::default(),
            ground_truth: None,
            year,
        }
    }

    /// Build a record from one raw component row
    pub fn from_row(row: ComponentRow, year: i32) -> Self {
        ComponentRecord {
            line_num: row.line_num,
            last_name: Field::text(row.lname),
            first_name: Field::text(row.fname),
            middle_name: Field::text(row.mname),
            second_middle_name: Field::text(row.m2name),
            neighborhood: Field::new(row.nb.filter(|nb| *nb != 0)),
            ground_truth: row.id.filter(|id| *id != 0),
            year,
        }
    }
}

impl fmt::Display for ComponentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn show<T: fmt::Display>(v: &Option<T>) -> String {
            match v {
                Some(v) => v.to_string(),
                None => "-".to_string(),
            }
        }

        write!(f, "#{}", self.line_num)?;
        for (label, field) in [
            ("lname", &self.last_name),
            ("fname", &self.first_name),
            ("mname", &self.middle_name),
            ("m2name", &self.second_middle_name),
        ] {
            write!(f, " {}={}→{}", label, show(&field.raw), show(&field.standardized))?;
        }
        write!(
            f,
            " nb={}→{}",
            show(&self.neighborhood.raw),
            show(&self.neighborhood.standardized)
        )
    }
}

/// Raw component table row, as stored in the source (and its CSV export)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentRow {
    #[serde(rename = "LINE_NUM")]
    pub line_num: i64,

    #[serde(rename = "LNAME")]
    pub lname: Option<String>,

    #[serde(rename = "FNAME")]
    pub fname: Option<String>,

    #[serde(rename = "MNAME")]
    pub mname: Option<String>,

    #[serde(rename = "M2NAME")]
    pub m2name: Option<String>,

    #[serde(rename = "NB")]
    pub nb: Option<i32>,

    #[serde(rename = "ID")]
    pub id: Option<i64>,
}

// ============================================================================
// NAME ALIAS
// ============================================================================

/// One alias-table entry: a canonical spelling and how often it was used
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardName {
    pub canonical: String,
    pub appearances: i64,
}

/// Raw alias table row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasRow {
    #[serde(rename = "NonStandardName")]
    pub non_standard_name: String,

    #[serde(rename = "StandardName")]
    pub standard_name: String,

    #[serde(rename = "Appearances")]
    pub appearances: i64,
}

// ============================================================================
// MASTER CANDIDATE
// ============================================================================

/// Column names of the master table, in storage order
pub const MASTER_COLUMNS: &[&str] = &[
    "id", "casen",
    "mlname", "smfname", "smmname", "smm2name",
    "byr_augm", "dyr", "marr",
    "lanam", "ritagl_matr", "silkm", "calimm", "cambm",
    "prior1", "buonuomini1", "gonfalonieri1", "balia1", "consultepratiche1", "acapir1", "capitani1",
    "bngh", "ngh351", "scrut363ngh", "ngh378", "scrut382ngh", "scrut392ngh", "ngh403",
    "scrut411ngh", "ngh427", "scrut433ngh", "gonfngh", "ngh480",
    "qt403",
    "mercanzia", "lana", "calim1", "fpart", "nc427", "calimcon1", "cambcons1", "lanacons1",
    "setacons1", "antmed_66", "mediceans_49",
    "balia_quarter",
];

/// Number of leading text-typed columns after the two id columns
const MASTER_TEXT_COLUMNS: usize = 4;

/// One row of the master registry: an identity and one of its cases.
///
/// Only `casen == 1` rows are scored. Sibling cases of the same identity
/// contribute their marriage year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MasterCandidate {
    // ========================================================================
    // IDENTITY
    // ========================================================================
    pub id: i64,
    pub casen: i32,

    // ========================================================================
    // NAMES (standardized in the registry)
    // ========================================================================
    pub mlname: Option<String>,
    pub smfname: Option<String>,
    pub smmname: Option<String>,
    pub smm2name: Option<String>,

    // ========================================================================
    // LIFE EVENTS
    // ========================================================================
    /// Birth year (augmented)
    pub byr_augm: Option<i32>,
    /// Death year
    pub dyr: Option<i32>,
    /// Marriage year
    pub marr: Option<i32>,

    // ========================================================================
    // GUILD MATRICULATION YEARS
    // ========================================================================
    pub lanam: Option<i32>,
    pub ritagl_matr: Option<i32>,
    pub silkm: Option<i32>,
    pub calimm: Option<i32>,
    pub cambm: Option<i32>,

    // ========================================================================
    // POLITICAL OFFICE YEARS
    // ========================================================================
    pub prior1: Option<i32>,
    pub buonuomini1: Option<i32>,
    pub gonfalonieri1: Option<i32>,
    pub balia1: Option<i32>,
    pub consultepratiche1: Option<i32>,
    pub acapir1: Option<i32>,
    pub capitani1: Option<i32>,

    // ========================================================================
    // NEIGHBORHOODS (per census / scrutiny)
    // ========================================================================
    pub bngh: Option<i32>,
    pub ngh351: Option<i32>,
    pub scrut363ngh: Option<i32>,
    pub ngh378: Option<i32>,
    pub scrut382ngh: Option<i32>,
    pub scrut392ngh: Option<i32>,
    pub ngh403: Option<i32>,
    pub scrut411ngh: Option<i32>,
    pub ngh427: Option<i32>,
    pub scrut433ngh: Option<i32>,
    pub gonfngh: Option<i32>,
    pub ngh480: Option<i32>,

    /// Quarter in the 1403 census
    pub qt403: Option<i32>,

    // ========================================================================
    // OTHER RECORDS
    // ========================================================================
    pub mercanzia: Option<i32>,
    pub lana: Option<i32>,
    pub calim1: Option<i32>,
    pub fpart: Option<i32>,
    pub nc427: Option<i32>,
    pub calimcon1: Option<i32>,
    pub cambcons1: Option<i32>,
    pub lanacons1: Option<i32>,
    pub setacons1: Option<i32>,
    pub antmed_66: Option<i32>,
    pub mediceans_49: Option<i32>,

    /// Coarse location: quarter of the 1458 balia
    pub balia_quarter: Option<i32>,
}

/// Registry columns encode "unknown" as NULL or 0
pub(crate) fn known(value: Option<i32>) -> Option<i32> {
    value.filter(|v| *v != 0)
}

pub(crate) fn known_text(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

impl MasterCandidate {
    pub fn is_canonical(&self) -> bool {
        self.casen == 1
    }

    /// Per-census neighborhoods in scan order.
    /// The 1458 census is left out so the evaluation against it stays unbiased.
    pub fn neighborhoods(&self) -> [Option<i32>; 12] {
        [
            self.bngh,
            self.ngh351,
            self.scrut363ngh,
            self.ngh378,
            self.scrut382ngh,
            self.scrut392ngh,
            self.ngh403,
            self.scrut411ngh,
            self.ngh427,
            self.scrut433ngh,
            self.gonfngh,
            self.ngh480,
        ]
        .map(known)
    }

    /// Integer columns after the ids and names, in `MASTER_COLUMNS` order
    fn integer_columns(&self) -> [Option<i32>; 40] {
        [
            self.byr_augm, self.dyr, self.marr,
            self.lanam, self.ritagl_matr, self.silkm, self.calimm, self.cambm,
            self.prior1, self.buonuomini1, self.gonfalonieri1, self.balia1,
            self.consultepratiche1, self.acapir1, self.capitani1,
            self.bngh, self.ngh351, self.scrut363ngh, self.ngh378, self.scrut382ngh,
            self.scrut392ngh, self.ngh403, self.scrut411ngh, self.ngh427, self.scrut433ngh,
            self.gonfngh, self.ngh480,
            self.qt403,
            self.mercanzia, self.lana, self.calim1, self.fpart, self.nc427, self.calimcon1,
            self.cambcons1, self.lanacons1, self.setacons1, self.antmed_66, self.mediceans_49,
            self.balia_quarter,
        ]
    }

    /// Values in `MASTER_COLUMNS` order, for parameter binding
    pub fn column_values(&self) -> Vec<rusqlite::types::Value> {
        use rusqlite::types::Value;

        let mut values = Vec::with_capacity(MASTER_COLUMNS.len());
        values.push(Value::Integer(self.id));
        values.push(Value::Integer(i64::from(self.casen)));
        for name in [&self.mlname, &self.smfname, &self.smmname, &self.smm2name] {
            values.push(match name {
                Some(s) => Value::Text(s.clone()),
                None => Value::Null,
            });
        }
        for v in self.integer_columns() {
            values.push(match v {
                Some(v) => Value::Integer(i64::from(v)),
                None => Value::Null,
            });
        }
        values
    }

    /// Decode a row selected with `MASTER_COLUMNS` in order
    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let int = |idx: usize| -> rusqlite::Result<Option<i32>> {
            row.get::<_, Option<i32>>(idx + 2 + MASTER_TEXT_COLUMNS)
        };

        Ok(MasterCandidate {
            id: row.get(0)?,
            casen: row.get(1)?,
            mlname: row.get(2)?,
            smfname: row.get(3)?,
            smmname: row.get(4)?,
            smm2name: row.get(5)?,
            byr_augm: int(0)?,
            dyr: int(1)?,
            marr: int(2)?,
            lanam: int(3)?,
            ritagl_matr: int(4)?,
            silkm: int(5)?,
            calimm: int(6)?,
            cambm: int(7)?,
            prior1: int(8)?,
            buonuomini1: int(9)?,
            gonfalonieri1: int(10)?,
            balia1: int(11)?,
            consultepratiche1: int(12)?,
            acapir1: int(13)?,
            capitani1: int(14)?,
            bngh: int(15)?,
            ngh351: int(16)?,
            scrut363ngh: int(17)?,
            ngh378: int(18)?,
            scrut382ngh: int(19)?,
            scrut392ngh: int(20)?,
            ngh403: int(21)?,
            scrut411ngh: int(22)?,
            ngh427: int(23)?,
            scrut433ngh: int(24)?,
            gonfngh: int(25)?,
            ngh480: int(26)?,
            qt403: int(27)?,
            mercanzia: int(28)?,
            lana: int(29)?,
            calim1: int(30)?,
            fpart: int(31)?,
            nc427: int(32)?,
            calimcon1: int(33)?,
            cambcons1: int(34)?,
            lanacons1: int(35)?,
            setacons1: int(36)?,
            antmed_66: int(37)?,
            mediceans_49: int(38)?,
            balia_quarter: int(39)?,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
