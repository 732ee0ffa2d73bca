//! Field lookup across a version, the base version and the protocol root.

use super::types::{
    Chemotherapy, CyclePlan, Evaluation, EventBlock, ImagingEvent, Investigations, PhaseBlocks,
    Protocol, Radiotherapy, Stratum, Support, Surgery, Version,
};

/// One selected version of a protocol.
///
/// Each accessor returns the block from the selected version if present,
/// else from the base version (`versiones[0]`), else from the protocol root.
#[derive(Debug, Clone, Copy)]
pub struct VersionView<'a> {
    protocol: &'a Protocol,
    version: Option<&'a Version>,
    base: Option<&'a Version>,
}

impl<'a> VersionView<'a> {
    /// Selects `version_id`, or the base version when it is absent or unknown.
    pub fn new(protocol: &'a Protocol, version_id: Option<&str>) -> Self {
        let base = protocol.versiones.first();
        let version = version_id
            .and_then(|id| protocol.versiones.iter().find(|v| v.id == id))
            .or(base);
        if let (Some(requested), Some(chosen)) = (version_id, version) {
            if chosen.id != requested {
                tracing::debug!(
                    protocol_id = %protocol.id,
                    requested,
                    "Unknown version, using base version"
                );
            }
        }
        Self {
            protocol,
            version,
            base,
        }
    }

    /// Id of the selected version; empty when the protocol has none.
    pub fn version_id(&self) -> &'a str {
        self.version.map(|v| v.id.as_str()).unwrap_or("")
    }

    fn layers(&self) -> impl Iterator<Item = &'a PhaseBlocks> {
        let base = match (self.version, self.base) {
            (Some(v), Some(b)) if std::ptr::eq(v, b) => None,
            (_, b) => b,
        };
        let protocol: &'a Protocol = self.protocol;
        self.version
            .map(|v| &v.blocks)
            .into_iter()
            .chain(base.map(|b| &b.blocks))
            .chain(std::iter::once(&protocol.blocks))
    }

    fn pick<T: ?Sized>(&self, field: impl Fn(&'a PhaseBlocks) -> Option<&'a T>) -> Option<&'a T> {
        self.layers().find_map(field)
    }

    pub fn evaluations(&self) -> &'a [Evaluation] {
        self.pick(|b| b.evaluacion.as_deref()).unwrap_or(&[])
    }

    pub fn surgery(&self) -> Option<&'a Surgery> {
        self.pick(|b| b.cirugia.as_ref())
    }

    pub fn radiotherapy(&self) -> Option<&'a Radiotherapy> {
        self.pick(|b| b.radioterapia.as_ref())
    }

    pub fn chemotherapy(&self) -> Option<&'a Chemotherapy> {
        self.pick(|b| b.quimioterapia.as_ref())
    }

    /// Flat `mantenimiento` block used by older documents.
    pub fn legacy_maintenance(&self) -> Option<&'a CyclePlan> {
        self.pick(|b| b.mantenimiento.as_ref())
    }

    pub fn immunotherapy(&self) -> Option<&'a EventBlock> {
        self.pick(|b| b.inmunoterapia.as_ref())
    }

    pub fn transplant(&self) -> Option<&'a EventBlock> {
        self.pick(|b| b.trasplante.as_ref())
    }

    pub fn prophylaxis(&self) -> Option<&'a EventBlock> {
        self.pick(|b| b.profilaxis.as_ref())
    }

    pub fn support(&self) -> Option<&'a Support> {
        self.pick(|b| b.soporte.as_ref())
    }

    pub fn follow_up(&self) -> Option<&'a EventBlock> {
        self.pick(|b| b.seguimiento.as_ref())
    }

    pub fn investigations(&self) -> Option<&'a Investigations> {
        self.pick(|b| b.investigaciones.as_ref())
    }

    pub fn imaging_events(&self) -> &'a [ImagingEvent] {
        self.pick(|b| {
            b.investigaciones
                .as_ref()
                .and_then(|inv| inv.imagen.as_ref())
                .map(|img| img.eventos.as_slice())
        })
        .unwrap_or(&[])
    }

    /// Risk arms of the selected version, falling back to the base version.
    pub fn strata(&self) -> &'a [Stratum] {
        self.version
            .and_then(|v| v.estratificacion.as_deref())
            .or_else(|| self.base.and_then(|b| b.estratificacion.as_deref()))
            .unwrap_or(&[])
    }

    /// The stratum flagged `default`, else the first one, else empty.
    pub fn default_stratum_id(&self) -> &'a str {
        let strata = self.strata();
        strata
            .iter()
            .find(|s| s.default)
            .or_else(|| strata.first())
            .map(|s| s.id.as_str())
            .unwrap_or("")
    }

    /// An explicit request wins (even an empty one, meaning "no filtering").
    pub fn select_stratum(&self, requested: Option<&str>) -> String {
        match requested {
            Some(id) => id.trim().to_string(),
            None => self.default_stratum_id().to_string(),
        }
    }
}
