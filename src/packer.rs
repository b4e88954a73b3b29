//! Orchestrierung des Packlaufs über mehrere Bins.
//!
//! Dieser Modul implementiert die Greedy-Heuristik zur Platzierung von Items:
//! - Normalisierung der Genauigkeit aller Maße und Gewichte
//! - stabile Sortierung von Bins und Items nach Volumen
//! - Wachstum entlang der Achsen ausgehend von bereits platzierten Items
//! - optionales Verteilen, bei dem ein Item nur in einem Bin landet
//!
//! Einmal platzierte Items werden nie wieder bewegt.

use log::{debug, info};
use serde::Serialize;

use crate::geometry::round_to;
use crate::model::{Bin, DEFAULT_PRECISION, Item, PutRejection, ValidationError, validate_precision};
use crate::types::{Axis, RotationType, Vec3};

/// Optionen für einen Packlauf.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PackOptions {
    /// Große Bins und Items zuerst (absteigend nach Volumen)
    pub bigger_first: bool,
    /// Platzierte Items aus dem gemeinsamen Pool entfernen, sodass spätere Bins sie nicht mehr sehen
    pub distribute_items: bool,
    /// Anzahl Nachkommastellen für Maße, Gewichte und Volumina
    pub precision: u32,
}

impl PackOptions {
    pub const DEFAULT_BIGGER_FIRST: bool = false;
    pub const DEFAULT_DISTRIBUTE_ITEMS: bool = false;
    pub const DEFAULT_PRECISION: u32 = DEFAULT_PRECISION;

    /// Erstellt einen Builder für benutzerdefinierte Optionen.
    pub fn builder() -> PackOptionsBuilder {
        PackOptionsBuilder::default()
    }

    /// Prüft die Optionen auf gültige Werte.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_precision(self.precision)
    }
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            bigger_first: Self::DEFAULT_BIGGER_FIRST,
            distribute_items: Self::DEFAULT_DISTRIBUTE_ITEMS,
            precision: Self::DEFAULT_PRECISION,
        }
    }
}

/// Builder für `PackOptions`.
#[derive(Clone, Debug, Default)]
pub struct PackOptionsBuilder {
    options: PackOptions,
}

impl PackOptionsBuilder {
    pub fn bigger_first(mut self, bigger_first: bool) -> Self {
        self.options.bigger_first = bigger_first;
        self
    }

    pub fn distribute_items(mut self, distribute_items: bool) -> Self {
        self.options.distribute_items = distribute_items;
        self
    }

    pub fn precision(mut self, precision: u32) -> Self {
        self.options.precision = precision;
        self
    }

    /// Erstellt die finalen Optionen.
    pub fn build(self) -> PackOptions {
        self.options
    }
}

/// Ereignisse, die während des Packens auftreten, um Live-Visualisierung zu ermöglichen.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type")]
pub enum PackEvent {
    /// Ein Bin wird befüllt.
    BinStarted {
        bin_index: usize,
        name: String,
        dims: (f64, f64, f64),
        max_weight: f64,
    },
    /// Ein Item wurde platziert.
    ItemPlaced {
        bin_index: usize,
        name: String,
        pos: (f64, f64, f64),
        dims: (f64, f64, f64),
        rotation: RotationType,
        weight: f64,
        total_weight: f64,
    },
    /// Ein Item passt nicht in diesen Bin.
    ItemUnfitted {
        bin_index: usize,
        name: String,
        dims: (f64, f64, f64),
        weight: f64,
        reason_code: String,
        reason_text: String,
    },
    /// Packen abgeschlossen.
    Finished {
        bins: usize,
        placed: usize,
        unfitted: usize,
    },
}

/// Kennzahlen eines abgeschlossenen Packlaufs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct PackSummary {
    pub bins: usize,
    /// Summe der platzierten Items über alle Bins
    pub placed: usize,
    /// Summe der nicht passenden Items über alle Bins
    pub unfitted: usize,
}

/// Hält Bins und den Pool noch zu packender Items.
#[derive(Clone, Debug, Default)]
pub struct Packer {
    bins: Vec<Bin>,
    items: Vec<Item>,
    total_items: usize,
}

impl Packer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bin(&mut self, bin: Bin) {
        self.bins.push(bin);
    }

    pub fn add_item(&mut self, item: Item) {
        self.items.push(item);
        self.total_items += 1;
    }

    /// Bins in ihrer aktuellen Reihenfolge (nach einem Lauf: sortiert).
    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    /// Noch ausstehende Items. Im Verteilmodus fehlen hier alle platzierten Items.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Anzahl aller jemals hinzugefügten Items.
    pub fn total_items(&self) -> usize {
        self.total_items
    }

    pub fn into_bins(self) -> Vec<Bin> {
        self.bins
    }

    /// Führt den Packlauf aus.
    ///
    /// # Rückgabewert
    /// `PackSummary` mit den Zählern über alle Bins, oder einen
    /// `ValidationError` bei ungültigen Optionen
    pub fn pack(&mut self, options: PackOptions) -> Result<PackSummary, ValidationError> {
        self.pack_with_progress(options, |_| {})
    }

    /// Packlauf mit Live-Progress Callback.
    ///
    /// Ruft für jede Entscheidung ein Callback auf (geeignet für SSE/WebSocket).
    /// Die Reihenfolge der Ereignisse entspricht der Reihenfolge der Entscheidungen.
    pub fn pack_with_progress(
        &mut self,
        options: PackOptions,
        mut on_event: impl FnMut(&PackEvent),
    ) -> Result<PackSummary, ValidationError> {
        options.validate()?;

        for bin in &mut self.bins {
            bin.normalize_precision(options.precision);
        }
        for item in &mut self.items {
            item.normalize_precision(options.precision);
        }

        // Stabile Sortierung: gleiche Volumina behalten die Einfügereihenfolge
        let bigger_first = options.bigger_first;
        self.bins.sort_by(|a, b| {
            if bigger_first {
                b.volume().total_cmp(&a.volume())
            } else {
                a.volume().total_cmp(&b.volume())
            }
        });
        self.items.sort_by(|a, b| {
            if bigger_first {
                b.volume().total_cmp(&a.volume())
            } else {
                a.volume().total_cmp(&b.volume())
            }
        });

        for (bin_index, bin) in self.bins.iter_mut().enumerate() {
            debug!("Bin {} startet: {}", bin_index, bin);
            on_event(&PackEvent::BinStarted {
                bin_index,
                name: bin.name.clone(),
                dims: (bin.width, bin.height, bin.depth),
                max_weight: bin.max_weight,
            });

            let mut accepted = vec![false; self.items.len()];
            for (idx, item) in self.items.iter().enumerate() {
                match pack_to_bin(bin, item) {
                    Ok(()) => {
                        accepted[idx] = true;
                        if let Some(placed) = bin.items.last() {
                            debug!("  platziert: {}", placed);
                            on_event(&PackEvent::ItemPlaced {
                                bin_index,
                                name: placed.name.clone(),
                                pos: placed.position.as_tuple(),
                                dims: placed.effective_dimensions().as_tuple(),
                                rotation: placed.rotation,
                                weight: placed.weight,
                                total_weight: bin.total_weight(),
                            });
                        }
                    }
                    Err(reason) => {
                        debug!("  nicht platziert: {} ({})", item, reason);
                        on_event(&PackEvent::ItemUnfitted {
                            bin_index,
                            name: item.name.clone(),
                            dims: (item.width, item.height, item.depth),
                            weight: item.weight,
                            reason_code: reason.code().to_string(),
                            reason_text: reason.to_string(),
                        });
                    }
                }
            }

            if options.distribute_items {
                let mut flags = accepted.into_iter();
                self.items.retain(|_| !flags.next().unwrap_or(false));
            }
        }

        let summary = PackSummary {
            bins: self.bins.len(),
            placed: self.bins.iter().map(|b| b.items.len()).sum(),
            unfitted: self.bins.iter().map(|b| b.unfitted_items.len()).sum(),
        };
        info!(
            "📦 Packlauf beendet: {} Bins, {} platziert, {} nicht passend, {} offen",
            summary.bins,
            summary.placed,
            summary.unfitted,
            self.items.len()
        );
        on_event(&PackEvent::Finished {
            bins: summary.bins,
            placed: summary.placed,
            unfitted: summary.unfitted,
        });
        Ok(summary)
    }
}

/// Versucht, ein Item in einem Bin zu platzieren.
///
/// Ein leerer Bin wird ausschließlich am Ursprung befüllt. Sonst werden
/// Kandidaten-Pivots erzeugt, indem von jedem platzierten Item entlang einer
/// Achse weitergewachsen wird: äußere Schleife über die Achsen
/// (Breite, Höhe, Tiefe), innere über die Items in Platzierungsreihenfolge.
/// Der erste erfolgreiche Pivot wird übernommen (First-Fit, kein Best-Fit).
///
/// # Rückgabewert
/// `Ok(())` bei Erfolg. Andernfalls landet eine Kopie des Items in
/// `bin.unfitted_items` und der aussagekräftigste Ablehnungsgrund wird zurückgegeben.
pub fn pack_to_bin(bin: &mut Bin, item: &Item) -> Result<(), PutRejection> {
    let outcome = if bin.items.is_empty() {
        bin.place(item, Vec3::zero())
    } else {
        grow_from_placed(bin, item)
    };

    if outcome.is_err() {
        bin.unfitted_items.push(item.clone());
    }
    outcome
}

fn grow_from_placed(bin: &mut Bin, item: &Item) -> Result<(), PutRejection> {
    let mut strongest = PutRejection::OutOfBounds;

    for axis in Axis::ALL {
        for idx in 0..bin.items.len() {
            let pivot = growth_pivot(&bin.items[idx], axis, bin.precision);
            match bin.place(item, pivot) {
                Ok(()) => return Ok(()),
                Err(reason) => {
                    if rejection_rank(reason) > rejection_rank(strongest) {
                        strongest = reason;
                    }
                }
            }
        }
    }

    Err(strongest)
}

/// Pivot direkt hinter `placed` entlang `axis`.
fn growth_pivot(placed: &Item, axis: Axis, precision: u32) -> Vec3 {
    let extent = placed.effective_dimensions().get(axis);
    placed
        .position
        .offset_along(axis, extent)
        .map(|v| round_to(v, precision))
}

// Gewicht ist die spezifischste Ablehnung: geometrisch hätte es gepasst
fn rejection_rank(reason: PutRejection) -> u8 {
    match reason {
        PutRejection::OutOfBounds => 0,
        PutRejection::Collision { .. } => 1,
        PutRejection::Overweight { .. } => 2,
    }
}
