//! Hand-written answers for the topics people ask about most.
//!
//! Matching is substring containment on the lowercased question; topics are
//! checked in table order and the first one with any matching keyword wins.

#[derive(Debug, Clone, Copy)]
pub struct PrecomputedTopic {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    pub answer: &'static str,
}

const PENSION_ANSWER: &str = r#"Entiendo tu situación con la pensión alimentaria. Te explico paso a paso qué hacer:

🏛️ **Dónde ir:**
• Juzgado de Familia de tu circuito judicial
• Defensa Pública (gratuita si calificas económicamente)
• PANI para orientación adicional

📋 **Documentos necesarios:**
• Acta de nacimiento del menor (original y copia)
• Tu cédula de identidad
• Cédula del otro progenitor (si la tienes)
• Comprobantes de gastos del menor
• Tu comprobante de ingresos

🚀 **Qué hacer:**
1. Presenta demanda en el Juzgado de Familia
2. Solicita medidas cautelares si hay urgencia
3. Pide retención salarial automática
4. Si no paga, puede haber apremio corporal

⚡ **Importante:** El incumplimiento puede llevar a retención de salario, embargo de bienes e incluso prisión.

💡 **Consejo:** Lleva todo organizado y pregunta por "medidas provisionales" para pensión urgente.

---

**¿En qué más puedo ayudarte?**
• ¿Necesitás que te explique más sobre alguno de estos pasos?
• ¿Querés saber qué hacer si el padre/madre vive en otro país?
• ¿Te gustaría conocer cuánto tiempo tarda cada etapa del proceso?
• ¿Tenés dudas sobre los costos o si hay manera de hacerlo gratis?

Estoy aquí para ayudarte con lo que necesites. ¡No dudes en preguntar! 😊"#;

const DURATION_ANSWER: &str = r#"Una conciliación generalmente dura:

⏱️ **Duración típica:**
• **Primera sesión:** 1-2 horas
• **Proceso completo:** 1-3 sesiones (dependiendo del caso)
• **Plazo total:** Usualmente se resuelve en 1-2 meses

📅 **Factores que influyen:**
• Complejidad del caso
• Disponibilidad de las partes
• Documentación necesaria
• Si hay acuerdo o no

✅ **Ventajas vs juicio:**
• Conciliación: 1-2 meses
• Juicio tradicional: 6 meses a 2+ años

🏛️ **Tipos de conciliación:**
• **Pre-procesal:** Antes de juicio (más rápida)
• **Procesal:** Durante el juicio
• **Judicial:** En el juzgado

💡 **Consejo:** La rapidez depende mucho de la actitud colaborativa de ambas partes.

----

**¿Te puedo ayudar con algo más?**
• ¿Querés saber cómo prepararte para una conciliación?
• ¿Necesitás información sobre qué pasa si no hay acuerdo?
• ¿Te interesa conocer qué casos se pueden conciliar?
• ¿Tenés dudas sobre los requisitos para iniciar?

Estoy aquí para ayudarte. 😊"#;

const FACILITATOR_ANSWER: &str = r#"Para ser Facilitador Judicial en Costa Rica, necesitas:

📋 **Requisitos:**
• Ser costarricense o extranjero con residencia legal
• Mayor de 25 años
• Título universitario o experiencia comprobada
• No tener antecedentes penales
• Capacitación certificada por el Poder Judicial

📚 **Capacitación:**
• Curso oficial del Poder Judicial
• Temas: mediación, conciliación, técnicas de facilitación
• Duración: variable según programa

🏛️ **Dónde informarte:**
• Poder Judicial: 2295-3000
• Dirección de Resolución Alterna de Conflictos

💼 **Funciones:**
• Facilitar procesos de conciliación
• Ayudar a las partes a llegar a acuerdos
• Orientar sobre procedimientos

💡 **Consejo:** Contacta directamente al Poder Judicial para información sobre próximas capacitaciones.

---

**¿Algo más en lo que te pueda ayudar?**
• ¿Querés saber más sobre el proceso de capacitación?
• ¿Te interesa conocer las funciones específicas de un facilitador?
• ¿Necesitás información sobre dónde dar el curso?
• ¿Tenés dudas sobre los requisitos o documentos?

Estoy aquí para ayudarte. ¡Seguí preguntando! 📚"#;

const CONCILIATION_ANSWER: &str = r#"La conciliación es un proceso voluntario para resolver conflictos. Te explico cómo funciona:

🤝 **¿Qué es?**
Es un proceso donde un facilitador neutral ayuda a las partes a llegar a un acuerdo sin ir a juicio.

📋 **Pasos del proceso:**
1. **Solicitud:** Una o ambas partes piden la conciliación
2. **Citación:** Se notifica a la otra parte
3. **Sesión:** El facilitador modera el diálogo
4. **Acuerdo:** Si hay acuerdo, se firma y tiene validez legal
5. **Sin acuerdo:** Se puede acudir a juicio

✅ **Ventajas:**
• Más rápido que un juicio
• Menos costoso
• Las partes mantienen el control
• Acuerdos más flexibles
• Menos conflictivo

🏛️ **Casos que se pueden conciliar:**
• Pensión alimentaria
• Regulación de visitas
• Conflictos laborales (algunos)
• Asuntos de familia
• Conflictos vecinales

⚠️ **No se concilia:**
• Delitos graves
• Violencia doméstica
• Derechos irrenunciables

💡 **Consejo:** La conciliación funciona mejor cuando ambas partes quieren llegar a un acuerdo.

----

**¿En qué más te puedo ayudar?**
• ¿Necesitás saber dónde solicitar una conciliación?
• ¿Querés conocer qué documentos llevar?
• ¿Te interesa saber cuánto cuesta?
• ¿Tenés dudas sobre si tu caso se puede conciliar?

Preguntame lo que necesites. 😊"#;

/// Order matters: the first topic with a matching keyword answers.
pub const DEFAULT_TOPICS: &[PrecomputedTopic] = &[
    PrecomputedTopic {
        name: "pension",
        keywords: &["pensión", "alimentos", "manutención", "pago", "hijo", "ex esposo", "ex esposa"],
        answer: PENSION_ANSWER,
    },
    PrecomputedTopic {
        name: "duracion_conciliacion",
        keywords: &["cuánto dura", "duración", "tiempo", "demora", "tarda", "cuanto tiempo"],
        answer: DURATION_ANSWER,
    },
    PrecomputedTopic {
        name: "facilitador",
        keywords: &[
            "facilitador judicial",
            "ser facilitador",
            "requisitos facilitador",
            "trabajo facilitador",
            "certificación facilitador",
            "curso facilitador",
        ],
        answer: FACILITATOR_ANSWER,
    },
    PrecomputedTopic {
        name: "proceso_conciliacion",
        keywords: &[
            "cómo funciona conciliación",
            "proceso de conciliación",
            "qué es conciliación",
            "conciliación judicial",
            "conciliar",
        ],
        answer: CONCILIATION_ANSWER,
    },
];

#[derive(Debug, Clone)]
pub struct PrecomputedResponses {
    topics: Vec<PrecomputedTopic>,
}

impl Default for PrecomputedResponses {
    fn default() -> Self {
        Self::new(DEFAULT_TOPICS.to_vec())
    }
}

impl PrecomputedResponses {
    pub fn new(topics: Vec<PrecomputedTopic>) -> Self {
        Self { topics }
    }

    pub fn find_match(&self, question: &str) -> Option<&'static str> {
        self.find_topic(question).map(|topic| topic.answer)
    }

    pub fn find_topic(&self, question: &str) -> Option<&PrecomputedTopic> {
        let question_lower = question.to_lowercase();
        self.topics
            .iter()
            .find(|topic| topic.keywords.iter().any(|k| question_lower.contains(k)))
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}
