use crate::dex::error::DexError;
use log::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LabelReference {
    /// Code unit offset of the branch instruction.
    instruction_offset: usize,
    /// Code unit holding the branch offset.
    field_offset: usize,
}

#[derive(Debug, Default)]
struct LabelData {
    bound_address: Option<usize>,
    references: Vec<LabelReference>,
}

/// Branch targets of one method body, resolved in two passes
///
/// A reference to a label that is already bound gets its offset immediately. Forward references
/// are recorded and patched into the code buffer when the label is bound.
#[derive(Debug, Default)]
pub(crate) struct LabelTable {
    labels: Vec<LabelData>,
}

fn relative_offset(target: usize, instruction_offset: usize) -> Result<u16, DexError> {
    let offset = target as i64 - instruction_offset as i64;
    if offset < i16::MIN as i64 || offset > i16::MAX as i64 {
        fail!(InvariantViolation, "branch offset {} does not fit in 16 bits", offset);
    }
    Ok(offset as i16 as u16)
}

impl LabelTable {
    pub(crate) fn make_label(&mut self) -> usize {
        self.labels.push(LabelData::default());
        self.labels.len() - 1
    }

    fn label_mut(&mut self, label: usize) -> Result<&mut LabelData, DexError> {
        self.labels
            .get_mut(label)
            .ok_or_else(|| err!(InvariantViolation, "label {} was never created", label))
    }

    /// The value to emit for a branch to `label`: the final offset when bound, otherwise 0 and a
    /// pending patch of `field_offset`.
    pub(crate) fn value(
        &mut self,
        label: usize,
        instruction_offset: usize,
        field_offset: usize,
    ) -> Result<i64, DexError> {
        let data = self.label_mut(label)?;
        match data.bound_address {
            Some(address) => Ok(address as i64 - instruction_offset as i64),
            None => {
                data.references.push(LabelReference {
                    instruction_offset,
                    field_offset,
                });
                Ok(0)
            }
        }
    }

    /// Binds `label` to the current end of `buffer` and patches every pending reference.
    pub(crate) fn bind(&mut self, label: usize, buffer: &mut [u16]) -> Result<(), DexError> {
        let address = buffer.len();
        let data = self.label_mut(label)?;
        if let Some(bound) = data.bound_address {
            fail!(InvariantViolation, "label {} is already bound at {}", label, bound);
        }
        data.bound_address = Some(address);

        for reference in data.references.drain(..) {
            let slot = buffer.get_mut(reference.field_offset).ok_or_else(|| {
                err!(InvariantViolation, "branch field {} is outside the code", reference.field_offset)
            })?;
            *slot = relative_offset(address, reference.instruction_offset)?;
            trace!(
                "patched branch at {} to label {} (+{})",
                reference.instruction_offset,
                label,
                address - reference.instruction_offset
            );
        }
        Ok(())
    }

    /// A label still waiting to be bound by at least one branch.
    pub(crate) fn first_unbound_reference(&self) -> Option<usize> {
        self.labels
            .iter()
            .position(|data| data.bound_address.is_none() && !data.references.is_empty())
    }
}
